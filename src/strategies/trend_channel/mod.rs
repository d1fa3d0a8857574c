//! Trend Channel Strategy
//!
//! Trend following on two Wilder-smoothed high/low channels. Entries follow
//! the trend on a channel crossover; exits are money based with optional
//! trend-change and channel-cross rules; stops tighten via break-even and
//! trailing logic.

mod config;
mod exits;
mod lifecycle;
mod signals;
mod stops;
mod strategy;

pub use config::{ClosingMethod, OpeningMethod, SlTpMode, TradeDirection, TrendChannelConfig};
pub use exits::{ExitReason, ExitRuleEvaluator};
pub use lifecycle::{OpenDecision, PositionLifecycleManager, SuppressReason};
pub use signals::{crossed_above, crossed_below, BandEdge, EntrySignalEvaluator, PriceField};
pub use stops::{is_tighter, ProtectiveStopAdjuster};
pub use strategy::TrendChannelStrategy;

use crate::{Config, Strategy};
use anyhow::{Context, Result};

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let params: TrendChannelConfig = config.strategy_params()?;
    params.validate().context("Invalid trend_channel config")?;
    Ok(Box::new(TrendChannelStrategy::new(
        config.label.clone(),
        config.instrument.clone(),
        params,
    )?))
}
