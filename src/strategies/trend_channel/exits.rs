//! Exit Rule Evaluator
//!
//! Per-position rules, first match wins:
//! 1. net profit at or above the take-profit amount
//! 2. net profit at or below minus the stop-loss amount
//! 3. position against the current trend (when enabled)
//! 4. close price crossing back through a band (closing method)
//!
//! The portfolio rule (global mode only) closes everything once the summed
//! net profit reaches either global threshold.

use tracing::{info, warn};

use crate::channel::{ChannelEngine, ChannelKind};
use crate::oms::{total_net_profit, Broker, Position};
use crate::trend::TrendState;
use crate::{Side, Symbol};

use super::config::{ClosingMethod, SlTpMode, TrendChannelConfig};
use super::signals::{BandEdge, EntrySignalEvaluator, PriceField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrendChange,
    ChannelCross,
    GlobalTakeProfit,
    GlobalStopLoss,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::TakeProfit => "take profit",
            ExitReason::StopLoss => "stop loss",
            ExitReason::TrendChange => "trend change",
            ExitReason::ChannelCross => "channel cross",
            ExitReason::GlobalTakeProfit => "global take profit",
            ExitReason::GlobalStopLoss => "global stop loss",
        };
        write!(f, "{}", s)
    }
}

pub struct ExitRuleEvaluator<'a> {
    config: &'a TrendChannelConfig,
    engine: &'a ChannelEngine,
}

impl<'a> ExitRuleEvaluator<'a> {
    pub fn new(config: &'a TrendChannelConfig, engine: &'a ChannelEngine) -> Self {
        Self { config, engine }
    }

    /// First matching exit rule for one position.
    ///
    /// `index` is the bar to read channels at; `None` means not enough
    /// history, which disables the channel-based rules.
    pub fn position_exit(&self, position: &Position, index: Option<usize>) -> Option<ExitReason> {
        if position.net_profit >= self.config.take_profit_amount {
            return Some(ExitReason::TakeProfit);
        }
        if position.net_profit <= -self.config.stop_loss_amount {
            return Some(ExitReason::StopLoss);
        }

        let index = index?;

        if self.config.close_on_trend_change {
            let against = match position.side {
                Side::Buy => TrendState::Down,
                Side::Sell => TrendState::Up,
            };
            if TrendState::at(self.engine, index) == against {
                return Some(ExitReason::TrendChange);
            }
        }

        let kind = match self.config.closing_method {
            ClosingMethod::Standard => return None,
            ClosingMethod::SlCrossShortChannel => ChannelKind::Short,
            ClosingMethod::SlCrossLongChannel => ChannelKind::Long,
        };
        let probe = EntrySignalEvaluator::new(self.engine);
        let crossed = match position.side {
            Side::Buy => probe.price_cross_below(PriceField::Close, kind, BandEdge::Low, index),
            Side::Sell => probe.price_cross_above(PriceField::Close, kind, BandEdge::High, index),
        };
        crossed.then_some(ExitReason::ChannelCross)
    }

    /// Aggregate exit over every position of the session (global mode only)
    pub fn portfolio_exit(&self, positions: &[Position]) -> Option<ExitReason> {
        if self.config.sltp_mode != SlTpMode::Global || positions.is_empty() {
            return None;
        }
        let total = total_net_profit(positions);
        if total >= self.config.global_take_profit {
            Some(ExitReason::GlobalTakeProfit)
        } else if total <= -self.config.global_stop_loss {
            Some(ExitReason::GlobalStopLoss)
        } else {
            None
        }
    }

    /// Close every position matching a per-position rule; returns closes requested
    pub fn close_matching(
        &self,
        label: &str,
        symbol: &Symbol,
        index: Option<usize>,
        broker: &mut dyn Broker,
    ) -> usize {
        let mut closed = 0;
        for position in broker.open_positions(label, symbol) {
            if let Some(reason) = self.position_exit(&position, index) {
                if close(&position, reason, broker) {
                    closed += 1;
                }
            }
        }
        closed
    }

    /// Apply the portfolio rule to the current book; returns closes requested
    pub fn close_portfolio(&self, label: &str, symbol: &Symbol, broker: &mut dyn Broker) -> usize {
        let positions = broker.open_positions(label, symbol);
        let Some(reason) = self.portfolio_exit(&positions) else {
            return 0;
        };
        info!(
            %reason,
            total = total_net_profit(&positions),
            positions = positions.len(),
            "Portfolio exit"
        );
        positions
            .iter()
            .filter(|p| close(p, reason, broker))
            .count()
    }
}

fn close(position: &Position, reason: ExitReason, broker: &mut dyn Broker) -> bool {
    match broker.close_position(position) {
        Ok(()) => {
            info!(
                position = position.id,
                side = %position.side,
                net_profit = position.net_profit,
                %reason,
                "Position closed"
            );
            true
        }
        Err(e) => {
            warn!(position = position.id, %reason, error = %e, "Close rejected");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oms::{BrokerRequest, InMemoryBroker};
    use crate::{Candle, InstrumentSpec, Quote};
    use chrono::{Duration, TimeZone, Utc};

    fn position(id: u64, side: Side, net_profit: f64) -> Position {
        Position {
            id,
            symbol: Symbol::new("EURUSD"),
            label: "TrendBot".to_string(),
            side,
            volume: 0.01,
            entry_price: 1.1,
            entry_time: Utc::now(),
            net_profit,
            stop_loss: None,
            take_profit: None,
        }
    }

    /// Closes given; low = close - 0.5, high = close + 0.5
    fn engine_from_closes(short: usize, long: usize, closes: &[f64]) -> ChannelEngine {
        let mut engine = ChannelEngine::new(short, long).unwrap();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, &c) in closes.iter().enumerate() {
            engine
                .update(Candle::new_unchecked(t0 + Duration::hours(i as i64), c, c + 0.5, c - 0.5, c, 0.0))
                .unwrap();
        }
        engine
    }

    #[test]
    fn test_money_rules_first_match() {
        let config = TrendChannelConfig::default();
        let engine = ChannelEngine::new(33, 144).unwrap();
        let eval = ExitRuleEvaluator::new(&config, &engine);

        assert_eq!(eval.position_exit(&position(1, Side::Buy, 50.0), None), Some(ExitReason::TakeProfit));
        assert_eq!(eval.position_exit(&position(1, Side::Buy, -50.0), None), Some(ExitReason::StopLoss));
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 49.9), None), None);
    }

    #[test]
    fn test_trend_change_closes_against_trend() {
        // Falling closes: short bands drop below long bands -> Down
        let closes: Vec<f64> = (0..10).map(|i| 100.0 - i as f64 * 2.0).collect();
        let engine = engine_from_closes(2, 4, &closes);
        let config = TrendChannelConfig::default();
        let eval = ExitRuleEvaluator::new(&config, &engine);
        let index = engine.signal_index();

        assert_eq!(TrendState::at(&engine, 9), TrendState::Down);
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 0.0), index), Some(ExitReason::TrendChange));
        assert_eq!(eval.position_exit(&position(2, Side::Sell, 0.0), index), None);

        let config = TrendChannelConfig { close_on_trend_change: false, ..Default::default() };
        let eval = ExitRuleEvaluator::new(&config, &engine);
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 0.0), index), None);
    }

    #[test]
    fn test_sl_cross_short_channel_uses_close() {
        // Flat at 100, then close drops under the short low band
        let engine = engine_from_closes(2, 3, &[100.0, 100.0, 100.0, 100.0, 98.0]);
        let config = TrendChannelConfig {
            closing_method: ClosingMethod::SlCrossShortChannel,
            close_on_trend_change: false,
            ..Default::default()
        };
        let eval = ExitRuleEvaluator::new(&config, &engine);
        let index = engine.signal_index();

        // Short low band: 99.5 at 3, 98.5 at 4; closes 100 >= 99.5 then 98 < 98.5
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 0.0), index), Some(ExitReason::ChannelCross));
        assert_eq!(eval.position_exit(&position(2, Side::Sell, 0.0), index), None);

        let config = TrendChannelConfig { closing_method: ClosingMethod::Standard, ..config };
        let eval = ExitRuleEvaluator::new(&config, &engine);
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 0.0), index), None);
    }

    #[test]
    fn test_sl_cross_long_channel() {
        let engine = engine_from_closes(2, 3, &[100.0, 100.0, 100.0, 100.0, 98.0]);
        let config = TrendChannelConfig {
            closing_method: ClosingMethod::SlCrossLongChannel,
            close_on_trend_change: false,
            ..Default::default()
        };
        let eval = ExitRuleEvaluator::new(&config, &engine);
        let index = engine.signal_index();

        // Long low band: 99.5 at 3, 98.83 at 4
        assert_eq!(eval.position_exit(&position(1, Side::Buy, 0.0), index), Some(ExitReason::ChannelCross));
        assert_eq!(eval.position_exit(&position(2, Side::Sell, 0.0), index), None);
    }

    #[test]
    fn test_sl_cross_closes_short_above_high_band() {
        // Flat at 100, then close jumps over the high bands
        let engine = engine_from_closes(2, 3, &[100.0, 100.0, 100.0, 100.0, 102.0]);
        let index = engine.signal_index();

        for closing_method in [ClosingMethod::SlCrossShortChannel, ClosingMethod::SlCrossLongChannel] {
            let config = TrendChannelConfig {
                closing_method,
                close_on_trend_change: false,
                ..Default::default()
            };
            let eval = ExitRuleEvaluator::new(&config, &engine);
            // Short high band 100.5 -> 101.5, long high band 100.5 -> 101.17
            assert_eq!(
                eval.position_exit(&position(1, Side::Sell, 0.0), index),
                Some(ExitReason::ChannelCross)
            );
            assert_eq!(eval.position_exit(&position(2, Side::Buy, 0.0), index), None);
        }
    }

    #[test]
    fn test_portfolio_exit_only_in_global_mode() {
        let engine = ChannelEngine::new(2, 3).unwrap();
        let book = vec![position(1, Side::Buy, 600.0), position(2, Side::Sell, 450.0)];

        let config = TrendChannelConfig::default();
        assert_eq!(ExitRuleEvaluator::new(&config, &engine).portfolio_exit(&book), None);

        let config = TrendChannelConfig { sltp_mode: SlTpMode::Global, ..Default::default() };
        let eval = ExitRuleEvaluator::new(&config, &engine);
        assert_eq!(eval.portfolio_exit(&book), Some(ExitReason::GlobalTakeProfit));
        let losing = vec![position(1, Side::Buy, -700.0), position(2, Side::Sell, -300.0)];
        assert_eq!(eval.portfolio_exit(&losing), Some(ExitReason::GlobalStopLoss));
        assert_eq!(eval.portfolio_exit(&[]), None);
    }

    #[test]
    fn test_close_matching_is_idempotent() {
        let instrument = InstrumentSpec::new(Symbol::new("EURUSD"), 0.0001);
        let mut broker = InMemoryBroker::new(instrument.clone());
        broker.set_quote(Quote::new(instrument.symbol.clone(), 1.1, 1.1002, Utc::now()));
        let winner = broker.seed_position(position(0, Side::Buy, 0.0));
        broker.seed_position(position(0, Side::Buy, 0.0));
        broker.set_net_profit(winner, 75.0);

        let config = TrendChannelConfig::default();
        let engine = ChannelEngine::new(33, 144).unwrap();
        let eval = ExitRuleEvaluator::new(&config, &engine);

        assert_eq!(eval.close_matching("TrendBot", &instrument.symbol, None, &mut broker), 1);
        assert_eq!(broker.requests(), &[BrokerRequest::Close(winner)]);

        broker.clear_requests();
        assert_eq!(eval.close_matching("TrendBot", &instrument.symbol, None, &mut broker), 0);
        assert!(broker.requests().is_empty());
    }
}
