//! Order requests issued by the strategies

use crate::oms::types::OrderType;
use crate::{Side, Symbol};

/// Order placement request
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Volume in lots, already normalized to the instrument's volume grid
    pub volume: f64,
    /// Trigger price (stop orders only)
    pub trigger_price: Option<f64>,
    /// Strategy session label
    pub label: String,
}

impl OrderRequest {
    /// Create a market order
    pub fn market(side: Side, symbol: Symbol, volume: f64, label: impl Into<String>) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Market,
            volume,
            trigger_price: None,
            label: label.into(),
        }
    }

    /// Create a stop order resting at `trigger_price`
    pub fn stop(
        side: Side,
        symbol: Symbol,
        volume: f64,
        trigger_price: f64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            symbol,
            side,
            order_type: OrderType::Stop,
            volume,
            trigger_price: Some(trigger_price),
            label: label.into(),
        }
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }
}

impl std::fmt::Display for OrderRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.trigger_price {
            Some(price) => write!(
                f,
                "{} {:?} {} {:.2} lots @ {} [{}]",
                self.side, self.order_type, self.symbol, self.volume, price, self.label
            ),
            None => write!(
                f,
                "{} {:?} {} {:.2} lots [{}]",
                self.side, self.order_type, self.symbol, self.volume, self.label
            ),
        }
    }
}
