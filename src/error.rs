//! Domain error types
//!
//! None of these are fatal: callers log them and keep processing bars, ticks
//! and lifecycle events.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::oms::OrderRejected;
use crate::{CandleValidationError, Symbol};

#[derive(Debug, Error)]
pub enum StrategyError {
    /// Not enough bars for a smoothed band to exist at the requested index.
    /// Every signal consumer treats this as "no signal".
    #[error("insufficient history: period {period} is undefined at index {index}")]
    InsufficientHistory { period: usize, index: usize },

    #[error("index {index} is beyond the series end (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("smoothing period must be >= 1, got {0}")]
    InvalidPeriod(usize),

    #[error("bar at {new} does not follow last bar at {last}")]
    OutOfOrderBar {
        last: DateTime<Utc>,
        new: DateTime<Utc>,
    },

    #[error("invalid candle: {0}")]
    InvalidCandle(#[from] CandleValidationError),

    #[error(transparent)]
    OrderRejected(#[from] OrderRejected),

    /// Lifecycle event for another label or instrument
    #[error("event for {label}/{symbol} ignored")]
    StaleEventIgnored { label: String, symbol: Symbol },
}

pub type StrategyResult<T> = Result<T, StrategyError>;
