//! Hedging Grid State Machine
//!
//! ```text
//!   Idle --position opened--> InitialOpen --hedge filled--> Hedged --hedge filled--> Hedged
//!     ^                                                                               |
//!     +------------------------- last position closed --------------------------------+
//! ```
//!
//! Each transition that places a stop order commits its state change only
//! after the broker accepts the order.

use tracing::{debug, info, warn};

use crate::error::StrategyResult;
use crate::oms::{total_net_profit, Broker, ManualCommand, OrderRequest, PendingOrder, Position};
use crate::strategies::Strategy;
use crate::{InstrumentSpec, Quote, RoundingMode, Side};

use super::config::HedgeGridConfig;
use super::session::{GridState, HedgeSession};

pub struct HedgeGridStrategy {
    label: String,
    instrument: InstrumentSpec,
    config: HedgeGridConfig,
    session: HedgeSession,
}

impl HedgeGridStrategy {
    pub fn new(label: impl Into<String>, instrument: InstrumentSpec, config: HedgeGridConfig) -> Self {
        Self {
            label: label.into(),
            instrument,
            config,
            session: HedgeSession::new(),
        }
    }

    pub fn config(&self) -> &HedgeGridConfig {
        &self.config
    }

    pub fn session(&self) -> &HedgeSession {
        &self.session
    }

    /// Operator command starting a session at the configured lots
    pub fn start_command(&self, side: Side) -> ManualCommand {
        ManualCommand::Open {
            side,
            lots: self.config.starting_lots,
        }
    }

    /// Place the stop order hedging a reference fill.
    ///
    /// A long reference is hedged by a sell stop below it, a short one by a
    /// buy stop above it.
    fn place_hedge(
        &self,
        reference_price: f64,
        reference_side: Side,
        lots: f64,
        broker: &mut dyn Broker,
    ) -> StrategyResult<()> {
        let distance = self.instrument.pips_to_price(self.config.hedge_distance_pips);
        let side = reference_side.opposite();
        let trigger = match reference_side {
            Side::Buy => reference_price - distance,
            Side::Sell => reference_price + distance,
        };
        let volume = self
            .instrument
            .normalize_volume(lots, self.config.volume_rounding);

        let request = OrderRequest::stop(side, self.instrument.symbol.clone(), volume, trigger, &self.label);
        match broker.place_order(&request) {
            Ok(ticket) => {
                info!(%request, lots, ?ticket, "Hedge stop placed");
                Ok(())
            }
            Err(e) => {
                warn!(%request, error = %e, "Hedge stop rejected");
                Err(e.into())
            }
        }
    }
}

impl Strategy for HedgeGridStrategy {
    fn name(&self) -> &'static str {
        "hedge_grid"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn instrument(&self) -> &InstrumentSpec {
        &self.instrument
    }

    fn volume_rounding(&self) -> RoundingMode {
        self.config.volume_rounding
    }

    /// Target / risk supervision
    fn on_tick(&mut self, _quote: &Quote, broker: &mut dyn Broker) -> StrategyResult<()> {
        let positions = broker.open_positions(&self.label, &self.instrument.symbol);
        if positions.is_empty() {
            return Ok(());
        }

        let net = total_net_profit(&positions);
        let risk = self.config.risk_usd.abs();
        let target = self.session.profit_target(&self.config);

        if net <= -risk {
            warn!(net, risk, state = %self.session.state(), "Risk limit hit, closing all");
        } else if net >= target {
            info!(net, target, state = %self.session.state(), "Profit target hit, closing all");
        } else {
            return Ok(());
        }

        // The reset follows from the close events
        let closed = broker.close_all(&self.label, &self.instrument.symbol);
        let cancelled = broker.cancel_all_pending(&self.label, &self.instrument.symbol);
        debug!(closed, cancelled, "Session flattened");
        Ok(())
    }

    fn on_position_opened(&mut self, position: &Position, broker: &mut dyn Broker) -> StrategyResult<()> {
        let tracked = broker
            .open_positions(&self.label, &self.instrument.symbol)
            .len();

        if self.session.state() != GridState::Idle {
            // Hedge fills are handled on the pending-order event
            self.session.record_open(position.side);
            debug!(position = position.id, state = %self.session.state(), "Position opened");
            return Ok(());
        }

        // Only the session's sole position starts a ladder
        if tracked != 1 {
            self.session.record_open(position.side);
            warn!(
                position = position.id,
                side = %position.side,
                tracked,
                "Position opened beside untracked ladder positions, no session started"
            );
            return Ok(());
        }

        let next_volume = position.volume * self.config.tr_multiplier;
        self.place_hedge(position.entry_price, position.side, next_volume, broker)?;
        self.session.commit_initial(next_volume);
        self.session.record_open(position.side);
        info!(
            position = position.id,
            side = %position.side,
            entry = position.entry_price,
            next_volume,
            "Session started"
        );
        Ok(())
    }

    fn on_pending_filled(&mut self, order: &PendingOrder, broker: &mut dyn Broker) -> StrategyResult<()> {
        if self.session.state() == GridState::Idle {
            warn!(order = order.id, side = %order.side, "Hedge fill with no active session, ignored");
            return Ok(());
        }

        let next_volume = (self.session.next_volume() * self.config.tr_multiplier).abs();
        self.place_hedge(order.target_price, order.side, next_volume, broker)?;
        self.session.commit_hedged(next_volume);
        info!(
            order = order.id,
            side = %order.side,
            trigger = order.target_price,
            next_volume,
            "Hedge filled"
        );
        Ok(())
    }

    fn on_position_closed(&mut self, position: &Position, broker: &mut dyn Broker) -> StrategyResult<()> {
        let left = broker
            .open_positions(&self.label, &self.instrument.symbol)
            .len();
        debug!(position = position.id, net_profit = position.net_profit, left, "Position closed");
        if left > 0 {
            return Ok(());
        }

        let cancelled = broker.cancel_all_pending(&self.label, &self.instrument.symbol);
        self.session.reset();
        info!(cancelled, "Session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oms::{BrokerAction, InMemoryBroker};
    use crate::Symbol;
    use approx::assert_relative_eq;
    use chrono::Utc;

    fn setup() -> (HedgeGridStrategy, InMemoryBroker) {
        let instrument = InstrumentSpec::new(Symbol::new("EURUSD"), 0.0001);
        let broker = InMemoryBroker::new(instrument.clone());
        (HedgeGridStrategy::new("HedgeBot", instrument, HedgeGridConfig::default()), broker)
    }

    /// Position as reported after the broker opened it
    fn opened(broker: &mut InMemoryBroker, side: Side, volume: f64, entry_price: f64) -> Position {
        let mut position = Position {
            id: 0,
            symbol: Symbol::new("EURUSD"),
            label: "HedgeBot".to_string(),
            side,
            volume,
            entry_price,
            entry_time: Utc::now(),
            net_profit: 0.0,
            stop_loss: None,
            take_profit: None,
        };
        position.id = broker.seed_position(position.clone());
        position
    }

    #[test]
    fn test_first_open_places_opposite_stop() {
        let (mut strategy, mut broker) = setup();
        strategy
            .on_position_opened(&opened(&mut broker, Side::Buy, 0.1, 1.1000), &mut broker)
            .unwrap();

        assert_eq!(strategy.session().state(), GridState::InitialOpen);
        assert_relative_eq!(strategy.session().next_volume(), 0.2);
        let pending = broker.pending_orders("HedgeBot", &Symbol::new("EURUSD"));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].side, Side::Sell);
        assert_relative_eq!(pending[0].target_price, 1.0960, epsilon = 1e-9);
        assert_relative_eq!(pending[0].volume, 0.2);
    }

    #[test]
    fn test_short_reference_hedged_above() {
        let (mut strategy, mut broker) = setup();
        strategy
            .on_position_opened(&opened(&mut broker, Side::Sell, 0.1, 1.1000), &mut broker)
            .unwrap();
        let pending = broker.pending_orders("HedgeBot", &Symbol::new("EURUSD"));
        assert_eq!(pending[0].side, Side::Buy);
        assert_relative_eq!(pending[0].target_price, 1.1040, epsilon = 1e-9);
    }

    #[test]
    fn test_rejected_hedge_leaves_session_idle() {
        let (mut strategy, mut broker) = setup();
        broker.reject(BrokerAction::PlaceOrder);
        assert!(strategy
            .on_position_opened(&opened(&mut broker, Side::Buy, 0.1, 1.1000), &mut broker)
            .is_err());
        assert_eq!(strategy.session().state(), GridState::Idle);
        assert_eq!(strategy.session().next_volume(), 0.0);
        assert_eq!(strategy.session().last_side(), None);
    }

    #[test]
    fn test_open_beside_leftover_positions_starts_nothing() {
        let (mut strategy, mut broker) = setup();
        opened(&mut broker, Side::Buy, 0.1, 1.1000);
        strategy
            .on_position_opened(&opened(&mut broker, Side::Sell, 0.2, 1.0960), &mut broker)
            .unwrap();

        assert_eq!(strategy.session().state(), GridState::Idle);
        assert!(broker.requests().is_empty());
        assert_eq!(strategy.session().last_side(), Some(Side::Sell));
    }

    #[test]
    fn test_second_open_after_rejected_start_starts_nothing() {
        let (mut strategy, mut broker) = setup();
        broker.reject(BrokerAction::PlaceOrder);
        assert!(strategy
            .on_position_opened(&opened(&mut broker, Side::Buy, 0.1, 1.1000), &mut broker)
            .is_err());

        broker.accept(BrokerAction::PlaceOrder);
        strategy
            .on_position_opened(&opened(&mut broker, Side::Sell, 0.3, 1.1000), &mut broker)
            .unwrap();

        assert_eq!(strategy.session().state(), GridState::Idle);
        assert!(broker.pending_orders("HedgeBot", &Symbol::new("EURUSD")).is_empty());
    }

    #[test]
    fn test_rejected_ladder_step_keeps_volume() {
        let (mut strategy, mut broker) = setup();
        strategy
            .on_position_opened(&opened(&mut broker, Side::Buy, 0.1, 1.1000), &mut broker)
            .unwrap();
        let filled = broker.pending_orders("HedgeBot", &Symbol::new("EURUSD"))[0].clone();

        broker.reject(BrokerAction::PlaceOrder);
        assert!(strategy.on_pending_filled(&filled, &mut broker).is_err());
        assert_eq!(strategy.session().state(), GridState::InitialOpen);
        assert_relative_eq!(strategy.session().next_volume(), 0.2);
    }

    #[test]
    fn test_fill_while_idle_is_ignored() {
        let (mut strategy, mut broker) = setup();
        let order = PendingOrder {
            id: 9,
            symbol: Symbol::new("EURUSD"),
            label: "HedgeBot".to_string(),
            side: Side::Sell,
            target_price: 1.0960,
            volume: 0.2,
        };
        strategy.on_pending_filled(&order, &mut broker).unwrap();
        assert_eq!(strategy.session().state(), GridState::Idle);
        assert!(broker.requests().is_empty());
    }

    #[test]
    fn test_start_command_uses_starting_lots() {
        let (strategy, _) = setup();
        assert_eq!(
            strategy.start_command(Side::Buy),
            ManualCommand::Open { side: Side::Buy, lots: 0.10 }
        );
    }
}
