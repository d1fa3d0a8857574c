//! Messages delivered to a strategy instance
//!
//! Price updates, lifecycle notifications from the broker and manual operator
//! commands all arrive as one typed stream and are processed one at a time.

use serde::{Deserialize, Serialize};

use crate::oms::types::{PendingOrder, Position};
use crate::{Candle, Quote, Side, Symbol};

/// Operator commands (the manual control panel)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ManualCommand {
    /// Open a market position for the strategy label
    Open { side: Side, lots: f64 },
    /// Close every tracked position and cancel every pending order
    CloseAll,
    /// Cancel pending orders only
    CancelPending,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrategyEvent {
    /// A completed bar for an instrument
    Bar { symbol: Symbol, candle: Candle },
    /// Bid/ask update
    Tick(Quote),
    PositionOpened(Position),
    PositionClosed(Position),
    PendingOrderFilled(PendingOrder),
    PendingOrderCancelled { order: PendingOrder, reason: String },
    Command(ManualCommand),
}

impl StrategyEvent {
    /// Instrument the event refers to, if any
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            StrategyEvent::Bar { symbol, .. } => Some(symbol),
            StrategyEvent::Tick(quote) => Some(&quote.symbol),
            StrategyEvent::PositionOpened(p) | StrategyEvent::PositionClosed(p) => Some(&p.symbol),
            StrategyEvent::PendingOrderFilled(o)
            | StrategyEvent::PendingOrderCancelled { order: o, .. } => Some(&o.symbol),
            StrategyEvent::Command(_) => None,
        }
    }

    /// Strategy label the event refers to, if any
    pub fn label(&self) -> Option<&str> {
        match self {
            StrategyEvent::PositionOpened(p) | StrategyEvent::PositionClosed(p) => Some(&p.label),
            StrategyEvent::PendingOrderFilled(o)
            | StrategyEvent::PendingOrderCancelled { order: o, .. } => Some(&o.label),
            _ => None,
        }
    }

    /// Whether a strategy session (label + instrument) should act on this event
    pub fn is_for(&self, label: &str, symbol: &Symbol) -> bool {
        self.symbol().map_or(true, |s| s == symbol) && self.label().map_or(true, |l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn order(label: &str, symbol: &str) -> PendingOrder {
        PendingOrder {
            id: 7,
            symbol: Symbol::new(symbol),
            label: label.to_string(),
            side: Side::Sell,
            target_price: 1.0960,
            volume: 0.2,
        }
    }

    #[test]
    fn test_lifecycle_scoped_by_label_and_symbol() {
        let eurusd = Symbol::new("EURUSD");
        let ev = StrategyEvent::PendingOrderFilled(order("HedgeBot", "EURUSD"));
        assert!(ev.is_for("HedgeBot", &eurusd));
        assert!(!ev.is_for("TrendBot", &eurusd));
        assert!(!ev.is_for("HedgeBot", &Symbol::new("GBPUSD")));
    }

    #[test]
    fn test_ticks_scoped_by_symbol_only() {
        let eurusd = Symbol::new("EURUSD");
        let tick = StrategyEvent::Tick(Quote::new(eurusd.clone(), 1.1, 1.1002, Utc::now()));
        assert!(tick.is_for("AnyLabel", &eurusd));
        assert!(!tick.is_for("AnyLabel", &Symbol::new("USDJPY")));
    }

    #[test]
    fn test_commands_always_apply() {
        let ev = StrategyEvent::Command(ManualCommand::CloseAll);
        assert!(ev.is_for("HedgeBot", &Symbol::new("EURUSD")));
        assert!(ev.symbol().is_none());
    }
}
