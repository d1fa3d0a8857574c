//! Execution collaborator interface
//!
//! The host platform owns market access, positions and pending orders. The
//! strategies query it for snapshots scoped by label and instrument, and issue
//! requests that either succeed or fail synchronously.

use thiserror::Error;
use tracing::{info, warn};

use crate::oms::events::StrategyEvent;
use crate::oms::request::OrderRequest;
use crate::oms::types::{OrderId, PendingOrder, Position, PositionId};
use crate::Symbol;

/// Kind of request the broker refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BrokerAction {
    PlaceOrder,
    ModifyPosition,
    ClosePosition,
    CancelOrder,
}

impl std::fmt::Display for BrokerAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerAction::PlaceOrder => write!(f, "place order"),
            BrokerAction::ModifyPosition => write!(f, "modify position"),
            BrokerAction::ClosePosition => write!(f, "close position"),
            BrokerAction::CancelOrder => write!(f, "cancel order"),
        }
    }
}

/// Broker refused a request
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{action} rejected: {reason}")]
pub struct OrderRejected {
    pub action: BrokerAction,
    pub reason: String,
}

impl OrderRejected {
    pub fn new(action: BrokerAction, reason: impl Into<String>) -> Self {
        Self {
            action,
            reason: reason.into(),
        }
    }
}

pub type BrokerResult<T> = Result<T, OrderRejected>;

/// Identifier returned for an accepted order request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTicket {
    /// Market order filled into a position
    Position(PositionId),
    /// Stop order resting on the book
    Pending(OrderId),
}

/// Market-data/execution collaborator used by the strategies
pub trait Broker {
    /// Open positions for a strategy label on one instrument, oldest first
    fn open_positions(&self, label: &str, symbol: &Symbol) -> Vec<Position>;

    /// Resting pending orders for a strategy label on one instrument
    fn pending_orders(&self, label: &str, symbol: &Symbol) -> Vec<PendingOrder>;

    /// Place a market or stop order
    fn place_order(&mut self, request: &OrderRequest) -> BrokerResult<OrderTicket>;

    /// Replace the protective levels of a position
    fn modify_position(
        &mut self,
        position: &Position,
        stop_loss: Option<f64>,
        take_profit: Option<f64>,
    ) -> BrokerResult<()>;

    fn close_position(&mut self, position: &Position) -> BrokerResult<()>;

    fn cancel_pending_order(&mut self, order: &PendingOrder) -> BrokerResult<()>;

    /// Lifecycle events produced by the broker since the last call.
    ///
    /// Hosts that deliver events through their own channel return nothing here.
    fn drain_events(&mut self) -> Vec<StrategyEvent> {
        Vec::new()
    }

    /// Close every position of a label/instrument; returns how many closed
    fn close_all(&mut self, label: &str, symbol: &Symbol) -> usize {
        let mut closed = 0;
        for position in self.open_positions(label, symbol) {
            match self.close_position(&position) {
                Ok(()) => {
                    closed += 1;
                    info!(
                        position = position.id,
                        side = %position.side,
                        net_profit = position.net_profit,
                        "Position closed"
                    );
                }
                Err(e) => warn!(position = position.id, error = %e, "Close failed"),
            }
        }
        closed
    }

    /// Cancel every pending order of a label/instrument; returns how many were cancelled
    fn cancel_all_pending(&mut self, label: &str, symbol: &Symbol) -> usize {
        let mut cancelled = 0;
        for order in self.pending_orders(label, symbol) {
            match self.cancel_pending_order(&order) {
                Ok(()) => cancelled += 1,
                Err(e) => warn!(order = order.id, error = %e, "Cancel failed"),
            }
        }
        cancelled
    }
}
