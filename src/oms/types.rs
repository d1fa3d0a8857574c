//! Core OMS types
//!
//! Positions and pending orders are owned by the execution collaborator. The
//! strategies only read these snapshots and request mutations through
//! [`Broker`](super::Broker).

use crate::{Side, Symbol};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Broker-assigned position identifier
pub type PositionId = u64;

/// Broker-assigned pending order identifier
pub type OrderId = u64;

/// Order type - determines execution logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Execute immediately at the current quote
    Market,

    /// Resting stop order: converts to market when triggered
    /// Buy stop: triggers when ask ≥ trigger price
    /// Sell stop: triggers when bid ≤ trigger price
    Stop,
}

/// Open position snapshot as reported by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub symbol: Symbol,
    /// Strategy session label the position was opened with
    pub label: String,
    pub side: Side,
    /// Volume in lots
    pub volume: f64,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    /// Floating plus realized profit in account currency, net of costs
    pub net_profit: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn belongs_to(&self, label: &str, symbol: &Symbol) -> bool {
        self.label == label && &self.symbol == symbol
    }
}

/// Resting stop order snapshot as reported by the broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub id: OrderId,
    pub symbol: Symbol,
    pub label: String,
    pub side: Side,
    pub target_price: f64,
    /// Volume in lots
    pub volume: f64,
}

impl PendingOrder {
    pub fn belongs_to(&self, label: &str, symbol: &Symbol) -> bool {
        self.label == label && &self.symbol == symbol
    }
}

/// Sum of net profit over a set of positions
pub fn total_net_profit<'a>(positions: impl IntoIterator<Item = &'a Position>) -> f64 {
    positions.into_iter().map(|p| p.net_profit).sum()
}
