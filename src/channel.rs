//! Channel Engine
//!
//! Keeps the bar history of one instrument and two smoothed band pairs over
//! it: a short-period pair and a long-period pair. Each pair is a Wilder
//! smoothing of the low prices (low band) and of the high prices (high band).
//!
//! Band values are aligned 1:1 with bar indices. For period `P` the first
//! value lives at 0-based index `P-1` (the simple average of the first `P`
//! samples); earlier indices are undefined and reading them yields
//! [`StrategyError::InsufficientHistory`].

use crate::error::{StrategyError, StrategyResult};
use crate::indicators::WilderSmoothing;
use crate::Candle;

/// Which of the two band pairs to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Short,
    Long,
}

/// Low/high band values at one index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub low: f64,
    pub high: f64,
}

// =============================================================================
// Price Series
// =============================================================================

/// Append-only bar history in strictly increasing time order
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    bars: Vec<Candle>,
}

impl PriceSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn push(&mut self, bar: Candle) -> StrategyResult<()> {
        if let Some(last) = self.bars.last() {
            if bar.datetime <= last.datetime {
                return Err(StrategyError::OutOfOrderBar {
                    last: last.datetime,
                    new: bar.datetime,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn get(&self, index: usize) -> StrategyResult<&Candle> {
        self.bars.get(index).ok_or(StrategyError::IndexOutOfRange {
            index,
            len: self.bars.len(),
        })
    }

    /// Bar `offset` positions back from the newest (0 = newest)
    pub fn from_end(&self, offset: usize) -> Option<&Candle> {
        self.bars.len().checked_sub(offset + 1).map(|i| &self.bars[i])
    }

    pub fn last_index(&self) -> Option<usize> {
        self.bars.len().checked_sub(1)
    }

    pub fn bars(&self) -> &[Candle] {
        &self.bars
    }
}

// =============================================================================
// Channel Pair
// =============================================================================

/// Smoothed low/high bands for one period
#[derive(Debug, Clone)]
pub struct ChannelPair {
    period: usize,
    low_filter: WilderSmoothing,
    high_filter: WilderSmoothing,
    // lows[k] / highs[k] belong to bar index k + period - 1
    lows: Vec<f64>,
    highs: Vec<f64>,
}

impl ChannelPair {
    pub fn new(period: usize) -> StrategyResult<Self> {
        Ok(Self {
            period,
            low_filter: WilderSmoothing::new(period)?,
            high_filter: WilderSmoothing::new(period)?,
            lows: Vec::new(),
            highs: Vec::new(),
        })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    fn push(&mut self, bar: &Candle) {
        let low = self.low_filter.next(bar.low);
        let high = self.high_filter.next(bar.high);
        if let (Some(low), Some(high)) = (low, high) {
            self.lows.push(low);
            self.highs.push(high);
        }
    }

    /// Bands at bar `index`, given the number of bars seen so far
    fn at(&self, index: usize, series_len: usize) -> StrategyResult<Bands> {
        if index >= series_len {
            return Err(StrategyError::IndexOutOfRange {
                index,
                len: series_len,
            });
        }
        let offset = (index + 1)
            .checked_sub(self.period)
            .ok_or(StrategyError::InsufficientHistory {
                period: self.period,
                index,
            })?;
        Ok(Bands {
            low: self.lows[offset],
            high: self.highs[offset],
        })
    }
}

// =============================================================================
// Channel Engine
// =============================================================================

/// Bar history plus the short and long band pairs
#[derive(Debug, Clone)]
pub struct ChannelEngine {
    series: PriceSeries,
    short: ChannelPair,
    long: ChannelPair,
}

impl ChannelEngine {
    pub fn new(short_period: usize, long_period: usize) -> StrategyResult<Self> {
        Ok(Self {
            series: PriceSeries::new(),
            short: ChannelPair::new(short_period)?,
            long: ChannelPair::new(long_period)?,
        })
    }

    /// Append a bar and advance both band pairs by one index
    pub fn update(&mut self, bar: Candle) -> StrategyResult<()> {
        self.series.push(bar)?;
        if let Some(bar) = self.series.from_end(0) {
            self.short.push(bar);
            self.long.push(bar);
        }
        Ok(())
    }

    pub fn bands_at(&self, kind: ChannelKind, index: usize) -> StrategyResult<Bands> {
        self.pair(kind).at(index, self.series.len())
    }

    pub fn period(&self, kind: ChannelKind) -> usize {
        self.pair(kind).period()
    }

    fn pair(&self, kind: ChannelKind) -> &ChannelPair {
        match kind {
            ChannelKind::Short => &self.short,
            ChannelKind::Long => &self.long,
        }
    }

    /// Bars needed before crossover signals may be evaluated
    pub fn min_history(&self) -> usize {
        self.short.period().max(self.long.period()) + 1
    }

    /// Newest bar index once enough history exists for crossovers
    pub fn signal_index(&self) -> Option<usize> {
        if self.series.len() < self.min_history() {
            return None;
        }
        self.series.last_index()
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
