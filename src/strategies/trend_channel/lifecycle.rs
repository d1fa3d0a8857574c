//! Position Lifecycle Manager
//!
//! Gatekeeper between an entry signal and the broker: direction filter,
//! per-side position cap, then pyramiding spacing from the most recent
//! same-side entry.

use tracing::{debug, info, warn};

use crate::error::StrategyResult;
use crate::oms::{Broker, OrderRequest, Position};
use crate::{InstrumentSpec, Quote, Side};

use super::config::TrendChannelConfig;

/// Pip distances within this tolerance of the step count as reaching it
const PIP_TOLERANCE: f64 = 1e-6;

/// Why an entry was not placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SuppressReason {
    DirectionNotAllowed,
    MaxPositionsReached { open: usize, max: usize },
    PyramidingSpacing { distance_pips: f64, required_pips: f64 },
}

impl std::fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SuppressReason::DirectionNotAllowed => write!(f, "direction not allowed"),
            SuppressReason::MaxPositionsReached { open, max } => {
                write!(f, "{} of {} positions open", open, max)
            }
            SuppressReason::PyramidingSpacing {
                distance_pips,
                required_pips,
            } => write!(
                f,
                "{:.1} pips from last entry, {:.1} required",
                distance_pips, required_pips
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OpenDecision {
    /// Order requested for this many lots
    Open(f64),
    Suppressed(SuppressReason),
}

pub struct PositionLifecycleManager<'a> {
    config: &'a TrendChannelConfig,
    instrument: &'a InstrumentSpec,
    label: &'a str,
}

impl<'a> PositionLifecycleManager<'a> {
    pub fn new(config: &'a TrendChannelConfig, instrument: &'a InstrumentSpec, label: &'a str) -> Self {
        Self {
            config,
            instrument,
            label,
        }
    }

    /// Run the entry policy against the current book without placing anything
    pub fn decide(&self, side: Side, quote: &Quote, positions: &[Position]) -> OpenDecision {
        if !self.config.trade_direction.allows(side) {
            return OpenDecision::Suppressed(SuppressReason::DirectionNotAllowed);
        }

        let same_side: Vec<&Position> = positions.iter().filter(|p| p.side == side).collect();
        if same_side.len() >= self.config.max_positions {
            return OpenDecision::Suppressed(SuppressReason::MaxPositionsReached {
                open: same_side.len(),
                max: self.config.max_positions,
            });
        }

        // Ties on entry time go to the later broker id
        if let Some(last) = same_side.iter().max_by_key(|p| (p.entry_time, p.id)) {
            let moved = match side {
                Side::Buy => quote.bid - last.entry_price,
                Side::Sell => last.entry_price - quote.ask,
            };
            let distance_pips = self.instrument.price_to_pips(moved);
            if distance_pips + PIP_TOLERANCE < self.config.pyramiding_step_pips {
                return OpenDecision::Suppressed(SuppressReason::PyramidingSpacing {
                    distance_pips,
                    required_pips: self.config.pyramiding_step_pips,
                });
            }
        }

        OpenDecision::Open(
            self.instrument
                .normalize_volume(self.config.volume_lots, self.config.volume_rounding),
        )
    }

    /// Apply the entry policy and request one market order when it passes.
    ///
    /// A rejected order is reported and not retried.
    pub fn try_open(
        &self,
        side: Side,
        quote: &Quote,
        broker: &mut dyn Broker,
    ) -> StrategyResult<OpenDecision> {
        let positions = broker.open_positions(self.label, &self.instrument.symbol);
        let decision = self.decide(side, quote, &positions);

        let volume = match decision {
            OpenDecision::Open(volume) => volume,
            OpenDecision::Suppressed(reason) => {
                debug!(%side, %reason, "Entry suppressed");
                return Ok(decision);
            }
        };

        let request = OrderRequest::market(side, self.instrument.symbol.clone(), volume, self.label);
        match broker.place_order(&request) {
            Ok(ticket) => {
                info!(%request, ?ticket, "Entry order placed");
                Ok(decision)
            }
            Err(e) => {
                warn!(%request, error = %e, "Entry order rejected");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oms::{BrokerAction, InMemoryBroker};
    use crate::Symbol;
    use chrono::{Duration, TimeZone, Utc};

    fn instrument() -> InstrumentSpec {
        InstrumentSpec::new(Symbol::new("EURUSD"), 0.0001)
    }

    fn quote(bid: f64) -> Quote {
        Quote::new(Symbol::new("EURUSD"), bid, bid + 0.0002, Utc::now())
    }

    fn position(id: u64, side: Side, entry_price: f64, minutes: i64) -> Position {
        Position {
            id,
            symbol: Symbol::new("EURUSD"),
            label: "TrendBot".to_string(),
            side,
            volume: 0.01,
            entry_price,
            entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes),
            net_profit: 0.0,
            stop_loss: None,
            take_profit: None,
        }
    }

    #[test]
    fn test_direction_filter_first() {
        let config = TrendChannelConfig {
            trade_direction: super::super::config::TradeDirection::OnlyShort,
            ..Default::default()
        };
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        assert_eq!(
            manager.decide(Side::Buy, &quote(1.1), &[]),
            OpenDecision::Suppressed(SuppressReason::DirectionNotAllowed)
        );
    }

    #[test]
    fn test_max_positions_counts_same_side_only() {
        let config = TrendChannelConfig { max_positions: 1, pyramiding_step_pips: 0.0, ..Default::default() };
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        let book = vec![position(1, Side::Sell, 1.2, 0)];

        assert!(matches!(manager.decide(Side::Buy, &quote(1.1), &book), OpenDecision::Open(_)));
        assert_eq!(
            manager.decide(Side::Sell, &quote(1.1), &book),
            OpenDecision::Suppressed(SuppressReason::MaxPositionsReached { open: 1, max: 1 })
        );
    }

    #[test]
    fn test_pyramiding_uses_most_recent_entry() {
        let config = TrendChannelConfig { max_positions: 5, ..Default::default() };
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        // Older entry far below, most recent at 1.1000
        let book = vec![position(1, Side::Buy, 1.0500, 0), position(2, Side::Buy, 1.1000, 10)];

        assert!(matches!(
            manager.decide(Side::Buy, &quote(1.1199), &book),
            OpenDecision::Suppressed(SuppressReason::PyramidingSpacing { .. })
        ));
        assert!(matches!(manager.decide(Side::Buy, &quote(1.1200), &book), OpenDecision::Open(_)));
    }

    #[test]
    fn test_pyramiding_short_uses_ask() {
        let config = TrendChannelConfig { max_positions: 5, ..Default::default() };
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        let book = vec![position(1, Side::Sell, 1.1000, 0)];

        // ask = bid + 2 pips: bid 1.0798 gives ask 1.0800, exactly 200 pips
        assert!(matches!(manager.decide(Side::Sell, &quote(1.0798), &book), OpenDecision::Open(_)));
        assert!(matches!(
            manager.decide(Side::Sell, &quote(1.0800), &book),
            OpenDecision::Suppressed(SuppressReason::PyramidingSpacing { .. })
        ));
    }

    #[test]
    fn test_try_open_places_one_market_order() {
        let config = TrendChannelConfig { volume_lots: 0.05, ..Default::default() };
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        let mut broker = InMemoryBroker::new(instrument.clone());
        broker.set_quote(quote(1.1));

        let decision = manager.try_open(Side::Buy, &quote(1.1), &mut broker).unwrap();
        assert_eq!(decision, OpenDecision::Open(0.05));
        assert_eq!(broker.requests().len(), 1);

        // Cap of one reached: nothing more is sent
        manager.try_open(Side::Buy, &quote(1.2), &mut broker).unwrap();
        assert_eq!(broker.requests().len(), 1);
    }

    #[test]
    fn test_try_open_reports_rejection() {
        let config = TrendChannelConfig::default();
        let instrument = instrument();
        let manager = PositionLifecycleManager::new(&config, &instrument, "TrendBot");
        let mut broker = InMemoryBroker::new(instrument.clone());
        broker.set_quote(quote(1.1));
        broker.reject(BrokerAction::PlaceOrder);

        assert!(manager.try_open(Side::Sell, &quote(1.1), &mut broker).is_err());
        assert!(broker.all_positions().is_empty());
    }
}
