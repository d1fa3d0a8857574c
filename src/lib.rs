//! Trend & Hedge Strategies
//!
//! Event-driven trading decision engines for a host platform that supplies
//! bars and quotes, executes orders and reports fills:
//! - a channel trend follower (Wilder-smoothed high/low bands, crossover
//!   entries, money-based exits, break-even and trailing stops)
//! - a hedging grid (alternating stop-order ladder with geometric volume)

pub mod channel;
pub mod config;
pub mod data;
pub mod error;
pub mod indicators;
pub mod oms;
pub mod runner;
pub mod strategies;
pub mod trend;
pub mod types;

pub use channel::{Bands, ChannelEngine, ChannelKind, PriceSeries};
pub use config::Config;
pub use error::{StrategyError, StrategyResult};
pub use runner::{RunStats, StrategyRunner};
pub use strategies::{available_strategies, create_strategy, Strategy};
pub use trend::TrendState;
pub use types::*;
