//! Hedge Grid Configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::RoundingMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HedgeGridConfig {
    /// Distance between ladder rungs in pips (default: 40)
    #[serde(default = "default_hedge_distance_pips")]
    pub hedge_distance_pips: f64,

    /// Volume multiplier per rung (default: 2.0)
    #[serde(default = "default_tr_multiplier")]
    pub tr_multiplier: f64,

    /// Lots for operator-started sessions (default: 0.10)
    #[serde(default = "default_starting_lots")]
    pub starting_lots: f64,

    /// Close-all target before any hedge filled (default: 40)
    #[serde(default = "default_initial_profit_target_usd")]
    pub initial_profit_target_usd: f64,

    /// Close-all target once hedged (default: 0)
    #[serde(default)]
    pub hedge_profit_target_usd: f64,

    /// Aggregate loss that closes everything (default: 100)
    #[serde(default = "default_risk_usd")]
    pub risk_usd: f64,

    #[serde(default)]
    pub volume_rounding: RoundingMode,
}

fn default_hedge_distance_pips() -> f64 {
    40.0
}
fn default_tr_multiplier() -> f64 {
    2.0
}
fn default_starting_lots() -> f64 {
    0.10
}
fn default_initial_profit_target_usd() -> f64 {
    40.0
}
fn default_risk_usd() -> f64 {
    100.0
}

impl Default for HedgeGridConfig {
    fn default() -> Self {
        Self {
            hedge_distance_pips: 40.0,
            tr_multiplier: 2.0,
            starting_lots: 0.10,
            initial_profit_target_usd: 40.0,
            hedge_profit_target_usd: 0.0,
            risk_usd: 100.0,
            volume_rounding: RoundingMode::ToNearest,
        }
    }
}

impl HedgeGridConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hedge_distance_pips <= 0.0 {
            bail!("hedge_distance_pips must be positive, got {}", self.hedge_distance_pips);
        }
        if self.tr_multiplier <= 0.0 {
            bail!("tr_multiplier must be positive, got {}", self.tr_multiplier);
        }
        if self.starting_lots <= 0.0 {
            bail!("starting_lots must be positive, got {}", self.starting_lots);
        }
        Ok(())
    }
}
