//! Hedge Grid Strategy
//!
//! Martingale ladder of alternating stop orders: every fill places the next
//! opposite stop one distance away with volume multiplied by TR. The session
//! closes on a money target or on the aggregate risk limit.

mod config;
mod session;
mod strategy;

pub use config::HedgeGridConfig;
pub use session::{GridState, HedgeSession};
pub use strategy::HedgeGridStrategy;

use crate::{Config, Strategy};
use anyhow::{Context, Result};

/// Create strategy from config (called by registry)
pub fn create(config: &Config) -> Result<Box<dyn Strategy>> {
    let params: HedgeGridConfig = config.strategy_params()?;
    params.validate().context("Invalid hedge_grid config")?;
    Ok(Box::new(HedgeGridStrategy::new(
        config.label.clone(),
        config.instrument.clone(),
        params,
    )))
}
