//! Entry Signal Evaluator
//!
//! Crossover tests between bar prices and smoothed bands, or between the two
//! band pairs. A crossover is strict: the series must be on one side at
//! `index - 1` and strictly on the other at `index`. Touching is not a cross.

use crate::channel::{ChannelEngine, ChannelKind};
use crate::Side;

use super::config::OpeningMethod;

/// `prev <= prev_ref` and `cur > cur_ref`
pub fn crossed_above(prev: f64, prev_ref: f64, cur: f64, cur_ref: f64) -> bool {
    prev <= prev_ref && cur > cur_ref
}

/// `prev >= prev_ref` and `cur < cur_ref`
pub fn crossed_below(prev: f64, prev_ref: f64, cur: f64, cur_ref: f64) -> bool {
    prev >= prev_ref && cur < cur_ref
}

/// Bar price a crossover reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Low,
    High,
    Close,
}

/// Which band of a pair a crossover reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandEdge {
    Low,
    High,
}

/// Detects entry crossovers on a channel engine's history
#[derive(Debug, Clone, Copy)]
pub struct EntrySignalEvaluator<'a> {
    engine: &'a ChannelEngine,
}

impl<'a> EntrySignalEvaluator<'a> {
    pub fn new(engine: &'a ChannelEngine) -> Self {
        Self { engine }
    }

    /// Whether `method` signals an entry on `side` at bar `index`.
    ///
    /// Returns false until `max(short, long) + 1` bars exist.
    pub fn evaluate(&self, method: OpeningMethod, side: Side, index: usize) -> bool {
        if index + 1 < self.engine.min_history() || index >= self.engine.len() {
            return false;
        }

        match method {
            OpeningMethod::ShortChannel => self.short_channel(side, index),
            OpeningMethod::LongChannel => self.long_channel(side, index),
            OpeningMethod::CrossChannel => self.cross_channel(side, index),
            OpeningMethod::BothChannel => {
                self.short_channel(side, index) || self.long_channel(side, index)
            }
            OpeningMethod::Manual => false,
        }
    }

    fn short_channel(&self, side: Side, index: usize) -> bool {
        match side {
            Side::Buy => self.price_cross_above(PriceField::Low, ChannelKind::Short, BandEdge::Low, index),
            Side::Sell => self.price_cross_below(PriceField::High, ChannelKind::Short, BandEdge::High, index),
        }
    }

    fn long_channel(&self, side: Side, index: usize) -> bool {
        match side {
            Side::Buy => self.price_cross_above(PriceField::Close, ChannelKind::Long, BandEdge::Low, index),
            Side::Sell => self.price_cross_below(PriceField::Close, ChannelKind::Long, BandEdge::High, index),
        }
    }

    fn cross_channel(&self, side: Side, index: usize) -> bool {
        let edge = match side {
            Side::Buy => BandEdge::Low,
            Side::Sell => BandEdge::High,
        };
        let (Some(s_prev), Some(s_cur), Some(l_prev), Some(l_cur)) = (
            self.band(ChannelKind::Short, edge, index - 1),
            self.band(ChannelKind::Short, edge, index),
            self.band(ChannelKind::Long, edge, index - 1),
            self.band(ChannelKind::Long, edge, index),
        ) else {
            return false;
        };
        match side {
            Side::Buy => crossed_above(s_prev, l_prev, s_cur, l_cur),
            Side::Sell => crossed_below(s_prev, l_prev, s_cur, l_cur),
        }
    }

    /// Price crossing above a band between `index - 1` and `index`
    pub fn price_cross_above(
        &self,
        field: PriceField,
        kind: ChannelKind,
        edge: BandEdge,
        index: usize,
    ) -> bool {
        self.price_pair(field, kind, edge, index)
            .is_some_and(|(p, pr, c, cr)| crossed_above(p, pr, c, cr))
    }

    /// Price crossing below a band between `index - 1` and `index`
    pub fn price_cross_below(
        &self,
        field: PriceField,
        kind: ChannelKind,
        edge: BandEdge,
        index: usize,
    ) -> bool {
        self.price_pair(field, kind, edge, index)
            .is_some_and(|(p, pr, c, cr)| crossed_below(p, pr, c, cr))
    }

    fn price_pair(
        &self,
        field: PriceField,
        kind: ChannelKind,
        edge: BandEdge,
        index: usize,
    ) -> Option<(f64, f64, f64, f64)> {
        let prev_index = index.checked_sub(1)?;
        Some((
            self.price(field, prev_index)?,
            self.band(kind, edge, prev_index)?,
            self.price(field, index)?,
            self.band(kind, edge, index)?,
        ))
    }

    fn price(&self, field: PriceField, index: usize) -> Option<f64> {
        let bar = self.engine.series().get(index).ok()?;
        Some(match field {
            PriceField::Low => bar.low,
            PriceField::High => bar.high,
            PriceField::Close => bar.close,
        })
    }

    // Undefined bands read as "no signal"
    fn band(&self, kind: ChannelKind, edge: BandEdge, index: usize) -> Option<f64> {
        let bands = self.engine.bands_at(kind, index).ok()?;
        Some(match edge {
            BandEdge::Low => bands.low,
            BandEdge::High => bands.high,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Candle;
    use chrono::{Duration, TimeZone, Utc};

    fn engine_with(short: usize, long: usize, bars: &[(f64, f64, f64)]) -> ChannelEngine {
        let mut engine = ChannelEngine::new(short, long).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, &(low, high, close)) in bars.iter().enumerate() {
            let bar = Candle::new_unchecked(t0 + Duration::hours(i as i64), close, high, low, close, 0.0);
            engine.update(bar).unwrap();
        }
        engine
    }

    #[test]
    fn test_crossover_helpers_are_strict() {
        assert!(crossed_above(1.0, 1.0, 1.1, 1.0));
        assert!(!crossed_above(1.0, 1.0, 1.0, 1.0));
        assert!(!crossed_above(1.1, 1.0, 1.2, 1.0));
        assert!(crossed_below(1.0, 1.0, 0.9, 1.0));
        assert!(!crossed_below(1.0, 1.0, 1.0, 1.0));
        assert!(!crossed_below(0.9, 1.0, 0.8, 1.0));
    }

    #[test]
    fn test_short_channel_buy_on_low_cross() {
        // Short period 2, long period 3: signals from index 3
        // lows: 10, 10, 10, 12 -> short low band at 2: 10, at 3: 11
        let engine = engine_with(
            2,
            3,
            &[(10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (12.0, 13.0, 12.5)],
        );
        let eval = EntrySignalEvaluator::new(&engine);
        assert!(eval.evaluate(OpeningMethod::ShortChannel, Side::Buy, 3));
        assert!(!eval.evaluate(OpeningMethod::ShortChannel, Side::Sell, 3));
        assert!(eval.evaluate(OpeningMethod::BothChannel, Side::Buy, 3));
        assert!(!eval.evaluate(OpeningMethod::Manual, Side::Buy, 3));
    }

    #[test]
    fn test_short_channel_sell_on_high_cross() {
        let engine = engine_with(
            2,
            3,
            &[(10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (9.0, 10.0, 9.5)],
        );
        let eval = EntrySignalEvaluator::new(&engine);
        assert!(eval.evaluate(OpeningMethod::ShortChannel, Side::Sell, 3));
        assert!(!eval.evaluate(OpeningMethod::ShortChannel, Side::Buy, 3));
    }

    #[test]
    fn test_long_channel_uses_close() {
        // Long low band (period 3) at 2: 10, close at 2: 10 (touch), close at 3 > band
        let engine = engine_with(
            2,
            3,
            &[(10.0, 11.0, 10.0), (10.0, 11.0, 10.0), (10.0, 11.0, 10.0), (10.0, 11.0, 10.8)],
        );
        let eval = EntrySignalEvaluator::new(&engine);
        assert!(eval.evaluate(OpeningMethod::LongChannel, Side::Buy, 3));
        // Lows never moved so the short channel sees no cross
        assert!(!eval.evaluate(OpeningMethod::ShortChannel, Side::Buy, 3));
        assert!(eval.evaluate(OpeningMethod::BothChannel, Side::Buy, 3));
    }

    #[test]
    fn test_long_channel_sell_uses_close() {
        // Long high band (period 3) at 2: 11, close at 2: 11 (touch), close at 3 < band
        let engine = engine_with(
            2,
            3,
            &[(10.0, 11.0, 11.0), (10.0, 11.0, 11.0), (10.0, 11.0, 11.0), (10.0, 11.0, 10.2)],
        );
        let eval = EntrySignalEvaluator::new(&engine);
        assert!(eval.evaluate(OpeningMethod::LongChannel, Side::Sell, 3));
        assert!(!eval.evaluate(OpeningMethod::LongChannel, Side::Buy, 3));
        // Highs never moved so the short channel sees no cross
        assert!(!eval.evaluate(OpeningMethod::ShortChannel, Side::Sell, 3));
        assert!(eval.evaluate(OpeningMethod::BothChannel, Side::Sell, 3));
    }

    #[test]
    fn test_cross_channel() {
        // Flat history, then a jump: short low band reacts faster than long
        let engine = engine_with(
            2,
            3,
            &[(10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (14.0, 15.0, 14.5)],
        );
        let eval = EntrySignalEvaluator::new(&engine);
        assert!(eval.evaluate(OpeningMethod::CrossChannel, Side::Buy, 3));
        assert!(!eval.evaluate(OpeningMethod::CrossChannel, Side::Sell, 3));
    }

    #[test]
    fn test_insufficient_history_is_no_signal() {
        let engine = engine_with(2, 3, &[(10.0, 11.0, 10.5), (10.0, 11.0, 10.5), (12.0, 13.0, 12.5)]);
        let eval = EntrySignalEvaluator::new(&engine);
        for method in [
            OpeningMethod::ShortChannel,
            OpeningMethod::LongChannel,
            OpeningMethod::CrossChannel,
            OpeningMethod::BothChannel,
        ] {
            assert!(!eval.evaluate(method, Side::Buy, 2));
        }
        assert!(!eval.evaluate(OpeningMethod::ShortChannel, Side::Buy, 10));
    }
}
