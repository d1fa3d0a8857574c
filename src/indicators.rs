//! Smoothing indicators backing the price channels
//!
//! Wilder's smoothing (a.k.a. RMA / SMMA) is an exponential average with
//! smoothing factor `1/period` instead of EMA's `2/(period+1)`, seeded with
//! the simple average of the first `period` samples:
//!
//! ```text
//! seed    = SMA(x[0..period])            at index period-1
//! band[i] = band[i-1] + (x[i] - band[i-1]) / period
//! ```
//!
//! Two flavours are provided: a batch function over a slice, and an
//! incremental filter consuming one sample at a time in O(1). The seed
//! average is delegated to the `ta` crate's `SimpleMovingAverage`.

use ta::indicators::SimpleMovingAverage;
use ta::Next;

use crate::error::{StrategyError, StrategyResult};

// =============================================================================
// Batch
// =============================================================================

/// Calculate Wilder's smoothing over a full series
///
/// Entries before index `period-1` are `None`.
pub fn wilder_smoothing(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if values.is_empty() || period == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(values.len());
    let mut smoothed: Option<f64> = None;

    for i in 0..values.len() {
        if i + 1 < period {
            result.push(None);
        } else if i + 1 == period {
            let sum: f64 = values[0..period].iter().sum();
            smoothed = Some(sum / period as f64);
            result.push(smoothed);
        } else {
            let prev = smoothed.unwrap_or(values[i]);
            let next = prev + (values[i] - prev) / period as f64;
            smoothed = Some(next);
            result.push(smoothed);
        }
    }

    result
}

// =============================================================================
// Incremental
// =============================================================================

/// Incremental Wilder smoothing filter
#[derive(Debug, Clone)]
pub struct WilderSmoothing {
    period: usize,
    seed: SimpleMovingAverage,
    count: usize,
    value: Option<f64>,
}

impl WilderSmoothing {
    pub fn new(period: usize) -> StrategyResult<Self> {
        let seed = SimpleMovingAverage::new(period).map_err(|_| StrategyError::InvalidPeriod(period))?;
        Ok(Self {
            period,
            seed,
            count: 0,
            value: None,
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Current smoothed value, `None` until `period` samples were seen
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Feed one sample and return the smoothed value (if defined yet)
    pub fn next(&mut self, sample: f64) -> Option<f64> {
        self.count += 1;
        self.value = match self.value {
            Some(prev) => Some(prev + (sample - prev) / self.period as f64),
            None => {
                let average = self.seed.next(sample);
                (self.count == self.period).then_some(average)
            }
        };
        self.value
    }
}

// =============================================================================
// Tests
// =============================================================================
