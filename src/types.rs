//! Core data types used across the strategy engines

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for candle data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandleValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("open ({open}) must be between low ({low}) and high ({high})")]
    OpenOutOfRange { open: f64, low: f64, high: f64 },

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("prices must be positive: open={open}, high={high}, low={low}, close={close}")]
    NonPositivePrice {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// OHLC bar for one aggregation interval of a single instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// Create a new candle with validation
    pub fn new(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, CandleValidationError> {
        let candle = Self::new_unchecked(datetime, open, high, low, close, volume);
        candle.validate()?;
        Ok(candle)
    }

    /// Create a candle without validation (for trusted host feeds)
    pub fn new_unchecked(
        datetime: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            datetime,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Validate OHLC consistency
    pub fn validate(&self) -> Result<(), CandleValidationError> {
        if self.open <= 0.0 || self.high <= 0.0 || self.low <= 0.0 || self.close <= 0.0 {
            return Err(CandleValidationError::NonPositivePrice {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.high < self.low {
            return Err(CandleValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.open < self.low || self.open > self.high {
            return Err(CandleValidationError::OpenOutOfRange {
                open: self.open,
                low: self.low,
                high: self.high,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(CandleValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Instrument symbol using Arc<str> for cheap cloning
///
/// Symbols travel with every event, position and order request, so clones
/// must stay O(1).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for Buy, -1 for Sell
    pub fn sign(self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Top-of-book quote delivered with every price update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: Symbol,
    pub bid: f64,
    pub ask: f64,
    pub time: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: Symbol, bid: f64, ask: f64, time: DateTime<Utc>) -> Self {
        Self {
            symbol,
            bid,
            ask,
            time,
        }
    }

    /// Price at which a position on `side` would be closed
    pub fn exit_price(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.bid,
            Side::Sell => self.ask,
        }
    }

    /// Price at which a market order on `side` would be filled
    pub fn entry_price(&self, side: Side) -> f64 {
        match side {
            Side::Buy => self.ask,
            Side::Sell => self.bid,
        }
    }
}

/// Volume rounding policy applied when converting lots to tradable volume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundingMode {
    #[default]
    ToNearest,
    Up,
    Down,
}

/// Static trading properties of one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: Symbol,
    /// Price units per pip
    pub pip_size: f64,
    /// Units of the base asset per lot (profit per price unit per lot)
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,
    /// Smallest tradable volume in lots
    #[serde(default = "default_min_volume")]
    pub min_volume: f64,
    /// Largest tradable volume in lots
    #[serde(default = "default_max_volume")]
    pub max_volume: f64,
    /// Volume increment in lots
    #[serde(default = "default_volume_step")]
    pub volume_step: f64,
}

fn default_lot_size() -> f64 {
    100_000.0
}
fn default_min_volume() -> f64 {
    0.01
}
fn default_max_volume() -> f64 {
    100.0
}
fn default_volume_step() -> f64 {
    0.01
}

impl InstrumentSpec {
    pub fn new(symbol: Symbol, pip_size: f64) -> Self {
        Self {
            symbol,
            pip_size,
            lot_size: default_lot_size(),
            min_volume: default_min_volume(),
            max_volume: default_max_volume(),
            volume_step: default_volume_step(),
        }
    }

    pub fn pips_to_price(&self, pips: f64) -> f64 {
        pips * self.pip_size
    }

    pub fn price_to_pips(&self, price_distance: f64) -> f64 {
        price_distance / self.pip_size
    }

    /// Snap a lot amount to the volume grid and clamp it into the tradable range
    pub fn normalize_volume(&self, lots: f64, rounding: RoundingMode) -> f64 {
        let steps = lots / self.volume_step;
        // Absorb representation error before Up/Down rounding (0.3 / 0.1 = 2.9999...)
        let steps = (steps * 1e9).round() / 1e9;
        let steps = match rounding {
            RoundingMode::ToNearest => steps.round(),
            RoundingMode::Up => steps.ceil(),
            RoundingMode::Down => steps.floor(),
        };
        let volume = steps * self.volume_step;
        let volume = (volume * 1e8).round() / 1e8;
        volume.clamp(self.min_volume, self.max_volume)
    }
}
