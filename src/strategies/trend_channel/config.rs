//! Trend Channel Configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::{RoundingMode, Side};

/// Which sides new positions may be opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TradeDirection {
    #[default]
    Both,
    OnlyLong,
    OnlyShort,
}

impl TradeDirection {
    pub fn allows(self, side: Side) -> bool {
        matches!(
            (self, side),
            (TradeDirection::Both, _)
                | (TradeDirection::OnlyLong, Side::Buy)
                | (TradeDirection::OnlyShort, Side::Sell)
        )
    }
}

/// Crossover used to open positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpeningMethod {
    /// Low/high price through the short band
    #[default]
    ShortChannel,
    /// Close price through the long band
    LongChannel,
    /// Short band through long band
    CrossChannel,
    /// ShortChannel or LongChannel
    BothChannel,
    /// Operator commands only
    Manual,
}

/// Extra channel-based exit rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClosingMethod {
    #[default]
    Standard,
    SlCrossShortChannel,
    SlCrossLongChannel,
}

/// Money-based exit scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlTpMode {
    /// Per-position take-profit/stop-loss amounts
    #[default]
    Position,
    /// Additionally close everything on aggregate profit/loss
    Global,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendChannelConfig {
    /// Short smoothing period (default: 33)
    #[serde(default = "default_short_period")]
    pub short_period: usize,

    /// Long smoothing period (default: 144)
    #[serde(default = "default_long_period")]
    pub long_period: usize,

    /// Lots per entry (default: 0.01)
    #[serde(default = "default_volume_lots")]
    pub volume_lots: f64,

    /// Max open positions per side (default: 1)
    #[serde(default = "default_max_positions")]
    pub max_positions: usize,

    #[serde(default)]
    pub trade_direction: TradeDirection,

    #[serde(default)]
    pub opening_method: OpeningMethod,

    /// Min distance from the last same-side entry (default: 200)
    #[serde(default = "default_pyramiding_step_pips")]
    pub pyramiding_step_pips: f64,

    #[serde(default)]
    pub closing_method: ClosingMethod,

    /// Per-position take-profit in account currency (default: 50)
    #[serde(default = "default_money_target")]
    pub take_profit_amount: f64,

    /// Per-position stop-loss in account currency (default: 50)
    #[serde(default = "default_money_target")]
    pub stop_loss_amount: f64,

    /// Close against-trend positions (default: true)
    #[serde(default = "default_true")]
    pub close_on_trend_change: bool,

    #[serde(default)]
    pub sltp_mode: SlTpMode,

    /// Aggregate take-profit in Global mode (default: 1000)
    #[serde(default = "default_global_target")]
    pub global_take_profit: f64,

    /// Aggregate stop-loss in Global mode (default: 1000)
    #[serde(default = "default_global_target")]
    pub global_stop_loss: f64,

    #[serde(default)]
    pub use_break_even: bool,

    /// Net profit that moves the stop to entry (default: 10)
    #[serde(default = "default_break_even_profit")]
    pub break_even_profit: f64,

    #[serde(default)]
    pub use_trailing_stop: bool,

    /// Net profit that arms the trailing stop (default: 5)
    #[serde(default = "default_trailing_stop_activation")]
    pub trailing_stop_activation: f64,

    /// Trailing distance from the exit price (default: 20)
    #[serde(default = "default_trailing_stop_distance_pips")]
    pub trailing_stop_distance_pips: f64,

    #[serde(default)]
    pub volume_rounding: RoundingMode,
}

fn default_short_period() -> usize {
    33
}
fn default_long_period() -> usize {
    144
}
fn default_volume_lots() -> f64 {
    0.01
}
fn default_max_positions() -> usize {
    1
}
fn default_pyramiding_step_pips() -> f64 {
    200.0
}
fn default_money_target() -> f64 {
    50.0
}
fn default_true() -> bool {
    true
}
fn default_global_target() -> f64 {
    1000.0
}
fn default_break_even_profit() -> f64 {
    10.0
}
fn default_trailing_stop_activation() -> f64 {
    5.0
}
fn default_trailing_stop_distance_pips() -> f64 {
    20.0
}

impl Default for TrendChannelConfig {
    fn default() -> Self {
        Self {
            short_period: 33,
            long_period: 144,
            volume_lots: 0.01,
            max_positions: 1,
            trade_direction: TradeDirection::Both,
            opening_method: OpeningMethod::ShortChannel,
            pyramiding_step_pips: 200.0,
            closing_method: ClosingMethod::Standard,
            take_profit_amount: 50.0,
            stop_loss_amount: 50.0,
            close_on_trend_change: true,
            sltp_mode: SlTpMode::Position,
            global_take_profit: 1000.0,
            global_stop_loss: 1000.0,
            use_break_even: false,
            break_even_profit: 10.0,
            use_trailing_stop: false,
            trailing_stop_activation: 5.0,
            trailing_stop_distance_pips: 20.0,
            volume_rounding: RoundingMode::ToNearest,
        }
    }
}

impl TrendChannelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.short_period == 0 || self.long_period == 0 {
            bail!(
                "channel periods must be >= 1 (short {}, long {})",
                self.short_period,
                self.long_period
            );
        }
        if self.max_positions == 0 {
            bail!("max_positions must be >= 1");
        }
        let non_negative = [
            ("volume_lots", self.volume_lots),
            ("pyramiding_step_pips", self.pyramiding_step_pips),
            ("take_profit_amount", self.take_profit_amount),
            ("stop_loss_amount", self.stop_loss_amount),
            ("global_take_profit", self.global_take_profit),
            ("global_stop_loss", self.global_stop_loss),
            ("break_even_profit", self.break_even_profit),
            ("trailing_stop_activation", self.trailing_stop_activation),
            ("trailing_stop_distance_pips", self.trailing_stop_distance_pips),
        ];
        if let Some((name, value)) = non_negative.iter().find(|(_, v)| *v < 0.0) {
            bail!("{} must not be negative, got {}", name, value);
        }
        Ok(())
    }
}
