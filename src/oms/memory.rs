//! In-memory execution collaborator
//!
//! Applies requests to in-memory books, marks positions to the latest quote,
//! triggers resting stop orders and protective levels, and queues the
//! lifecycle events a host platform would deliver. Every request is recorded
//! so callers can inspect exactly what a strategy asked for.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::oms::broker::{Broker, BrokerAction, BrokerResult, OrderRejected, OrderTicket};
use crate::oms::events::StrategyEvent;
use crate::oms::request::OrderRequest;
use crate::oms::types::{OrderId, OrderType, PendingOrder, Position, PositionId};
use crate::{InstrumentSpec, Quote, Side, Symbol};

/// A request as received by the broker
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerRequest {
    Place(OrderRequest),
    Modify {
        position: PositionId,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    },
    Close(PositionId),
    Cancel(OrderId),
}

#[derive(Debug, Default)]
pub struct InMemoryBroker {
    instruments: HashMap<Symbol, InstrumentSpec>,
    quotes: HashMap<Symbol, Quote>,
    positions: Vec<Position>,
    pending: Vec<PendingOrder>,
    next_id: u64,
    requests: Vec<BrokerRequest>,
    events: Vec<StrategyEvent>,
    rejected_actions: HashSet<BrokerAction>,
}

impl InMemoryBroker {
    pub fn new(instrument: InstrumentSpec) -> Self {
        let mut broker = Self {
            next_id: 1,
            ..Self::default()
        };
        broker
            .instruments
            .insert(instrument.symbol.clone(), instrument);
        broker
    }

    /// Register an additional instrument
    pub fn with_instrument(mut self, instrument: InstrumentSpec) -> Self {
        self.instruments
            .insert(instrument.symbol.clone(), instrument);
        self
    }

    /// Refuse every request of `action` until [`accept`](Self::accept) is called
    pub fn reject(&mut self, action: BrokerAction) {
        self.rejected_actions.insert(action);
    }

    pub fn accept(&mut self, action: BrokerAction) {
        self.rejected_actions.remove(&action);
    }

    /// Install a new quote: mark positions, hit protective levels, trigger stops
    pub fn set_quote(&mut self, quote: Quote) {
        let symbol = quote.symbol.clone();
        self.quotes.insert(symbol.clone(), quote.clone());
        self.mark_to_market(&symbol);
        self.hit_protective_levels(&quote);
        self.trigger_pending(&quote);
    }

    pub fn quote(&self, symbol: &Symbol) -> Option<&Quote> {
        self.quotes.get(symbol)
    }

    /// Override a position's reported net profit (until the next quote)
    pub fn set_net_profit(&mut self, id: PositionId, net_profit: f64) {
        if let Some(p) = self.positions.iter_mut().find(|p| p.id == id) {
            p.net_profit = net_profit;
        }
    }

    /// Add a position that already exists at the broker, without emitting events
    pub fn seed_position(&mut self, mut position: Position) -> PositionId {
        position.id = self.allocate_id();
        let id = position.id;
        self.positions.push(position);
        id
    }

    pub fn all_positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn all_pending(&self) -> &[PendingOrder] {
        &self.pending
    }

    pub fn requests(&self) -> &[BrokerRequest] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn check_allowed(&self, action: BrokerAction) -> BrokerResult<()> {
        if self.rejected_actions.contains(&action) {
            return Err(OrderRejected::new(action, "rejected by broker"));
        }
        Ok(())
    }

    fn profit(&self, position: &Position, quote: &Quote) -> f64 {
        let lot_size = self
            .instruments
            .get(&position.symbol)
            .map(|i| i.lot_size)
            .unwrap_or(1.0);
        let exit = quote.exit_price(position.side);
        (exit - position.entry_price) * position.side.sign() * position.volume * lot_size
    }

    fn mark_to_market(&mut self, symbol: &Symbol) {
        let Some(quote) = self.quotes.get(symbol).cloned() else {
            return;
        };
        let profits: Vec<(usize, f64)> = self
            .positions
            .iter()
            .enumerate()
            .filter(|(_, p)| &p.symbol == symbol)
            .map(|(i, p)| (i, self.profit(p, &quote)))
            .collect();
        for (i, profit) in profits {
            self.positions[i].net_profit = profit;
        }
    }

    fn hit_protective_levels(&mut self, quote: &Quote) {
        let hit: Vec<PositionId> = self
            .positions
            .iter()
            .filter(|p| p.symbol == quote.symbol)
            .filter(|p| {
                let exit = quote.exit_price(p.side);
                let stop_hit = p.stop_loss.is_some_and(|sl| match p.side {
                    Side::Buy => exit <= sl,
                    Side::Sell => exit >= sl,
                });
                let target_hit = p.take_profit.is_some_and(|tp| match p.side {
                    Side::Buy => exit >= tp,
                    Side::Sell => exit <= tp,
                });
                stop_hit || target_hit
            })
            .map(|p| p.id)
            .collect();

        for id in hit {
            if let Some(idx) = self.positions.iter().position(|p| p.id == id) {
                let position = self.positions.remove(idx);
                debug!(position = id, "Protective level hit");
                self.events.push(StrategyEvent::PositionClosed(position));
            }
        }
    }

    fn trigger_pending(&mut self, quote: &Quote) {
        let (triggered, resting): (Vec<PendingOrder>, Vec<PendingOrder>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|o| {
                    o.symbol == quote.symbol
                        && match o.side {
                            Side::Buy => quote.ask >= o.target_price,
                            Side::Sell => quote.bid <= o.target_price,
                        }
                });
        self.pending = resting;

        for order in triggered {
            let position = self.open_position(
                order.symbol.clone(),
                order.label.clone(),
                order.side,
                order.volume,
                order.target_price,
                quote.time,
            );
            debug!(order = order.id, position = position.id, "Pending order filled");
            self.events.push(StrategyEvent::PositionOpened(position));
            self.events.push(StrategyEvent::PendingOrderFilled(order));
        }
    }

    fn open_position(
        &mut self,
        symbol: Symbol,
        label: String,
        side: Side,
        volume: f64,
        entry_price: f64,
        entry_time: DateTime<Utc>,
    ) -> Position {
        let mut position = Position {
            id: self.allocate_id(),
            symbol,
            label,
            side,
            volume,
            entry_price,
            entry_time,
            net_profit: 0.0,
            stop_loss: None,
            take_profit: None,
        };
        if let Some(quote) = self.quotes.get(&position.symbol) {
            position.net_profit = self.profit(&position, quote);
        }
        self.positions.push(position.clone());
        position
    }
}

impl Broker for InMemoryBroker {
    fn open_positions(&self, label: &str, symbol: &Symbol) -> Vec<Position> {
        self.positions
            .iter()
            .filter(|p| p.belongs_to(label, symbol))
            .cloned()
            .collect()
    }

    fn pending_orders(&self, label: &str, symbol: &Symbol) -> Vec<PendingOrder> {
        self.pending
            .iter()
            .filter(|o| o.belongs_to(label, symbol))
            .cloned()
            .collect()
    }

    fn place_order(&mut self, request: &OrderRequest) -> BrokerResult<OrderTicket> {
        self.requests.push(BrokerRequest::Place(request.clone()));
        self.check_allowed(BrokerAction::PlaceOrder)?;
        if request.volume <= 0.0 {
            return Err(OrderRejected::new(
                BrokerAction::PlaceOrder,
                format!("invalid volume {}", request.volume),
            ));
        }

        match request.order_type {
            OrderType::Market => {
                let quote = self.quotes.get(&request.symbol).cloned().ok_or_else(|| {
                    OrderRejected::new(
                        BrokerAction::PlaceOrder,
                        format!("no quote for {}", request.symbol),
                    )
                })?;
                let position = self.open_position(
                    request.symbol.clone(),
                    request.label.clone(),
                    request.side,
                    request.volume,
                    quote.entry_price(request.side),
                    quote.time,
                );
                let id = position.id;
                self.events.push(StrategyEvent::PositionOpened(position));
                Ok(OrderTicket::Position(id))
            }
            OrderType::Stop => {
                let target_price = request.trigger_price.ok_or_else(|| {
                    OrderRejected::new(BrokerAction::PlaceOrder, "stop order without trigger")
                })?;
                let order = PendingOrder {
                    id: self.allocate_id(),
                    symbol: request.symbol.clone(),
                    label: request.label.clone(),
                    side: request.side,
                    target_price,
                    volume: request.volume,
                };
                let id = order.id;
                self.pending.push(order);
                Ok(OrderTicket::Pending(id))
            }
        }
    }

    fn modify_position(
        &mut self,
        position: &Position,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> BrokerResult<()> {
        self.requests.push(BrokerRequest::Modify {
            position: position.id,
            stop_loss,
            take_profit,
        });
        self.check_allowed(BrokerAction::ModifyPosition)?;
        let held = self
            .positions
            .iter_mut()
            .find(|p| p.id == position.id)
            .ok_or_else(|| {
                OrderRejected::new(BrokerAction::ModifyPosition, "position not found")
            })?;
        held.stop_loss = stop_loss;
        held.take_profit = take_profit;
        Ok(())
    }

    fn close_position(&mut self, position: &Position) -> BrokerResult<()> {
        self.requests.push(BrokerRequest::Close(position.id));
        self.check_allowed(BrokerAction::ClosePosition)?;
        let idx = self
            .positions
            .iter()
            .position(|p| p.id == position.id)
            .ok_or_else(|| OrderRejected::new(BrokerAction::ClosePosition, "position not found"))?;
        let closed = self.positions.remove(idx);
        self.events.push(StrategyEvent::PositionClosed(closed));
        Ok(())
    }

    fn cancel_pending_order(&mut self, order: &PendingOrder) -> BrokerResult<()> {
        self.requests.push(BrokerRequest::Cancel(order.id));
        self.check_allowed(BrokerAction::CancelOrder)?;
        let idx = self
            .pending
            .iter()
            .position(|o| o.id == order.id)
            .ok_or_else(|| OrderRejected::new(BrokerAction::CancelOrder, "order not found"))?;
        let cancelled = self.pending.remove(idx);
        self.events.push(StrategyEvent::PendingOrderCancelled {
            order: cancelled,
            reason: "cancelled by strategy".to_string(),
        });
        Ok(())
    }

    fn drain_events(&mut self) -> Vec<StrategyEvent> {
        std::mem::take(&mut self.events)
    }
}
