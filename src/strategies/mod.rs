//! Trading Strategies Module
//!
//! Strategy framework with:
//! - Event-driven trait interface that all strategies implement
//! - Label/instrument scoping of lifecycle events
//! - Shared handling of operator commands and start-up rediscovery
//! - Dynamic strategy registry (no hardcoded names)

pub mod hedge_grid;
pub mod trend_channel;

use crate::error::{StrategyError, StrategyResult};
use crate::oms::{Broker, ManualCommand, OrderRequest, PendingOrder, Position, StrategyEvent};
use crate::{Candle, Config, InstrumentSpec, Quote, RoundingMode};
use anyhow::Result;
use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};
use tracing::{debug, info, warn};

// =============================================================================
// Strategy Trait - The contract all strategies must implement
// =============================================================================

/// Trading strategy driven by one sequential stream of events.
///
/// Callbacks never run concurrently for one instance and never block. Errors
/// returned from a callback are logged by the caller; they never stop the
/// stream.
pub trait Strategy: Send + Sync {
    /// Strategy identifier (must match config's strategy_name)
    fn name(&self) -> &'static str;

    /// Session label tagging this strategy's orders
    fn label(&self) -> &str;

    fn instrument(&self) -> &InstrumentSpec;

    /// Rounding applied to manual order volumes
    fn volume_rounding(&self) -> RoundingMode {
        RoundingMode::default()
    }

    /// Rediscover live positions and pending orders after a (re)start
    fn on_start(&mut self, broker: &mut dyn Broker) {
        let symbol = &self.instrument().symbol;
        let positions = broker.open_positions(self.label(), symbol);
        let pending = broker.pending_orders(self.label(), symbol);
        info!(
            strategy = self.name(),
            label = self.label(),
            symbol = %symbol,
            positions = positions.len(),
            pending = pending.len(),
            "Strategy started"
        );
        for p in &positions {
            debug!(position = p.id, side = %p.side, volume = p.volume, entry = p.entry_price, "Rediscovered position");
        }
        for o in &pending {
            debug!(order = o.id, side = %o.side, volume = o.volume, trigger = o.target_price, "Rediscovered pending order");
        }
    }

    /// A completed bar
    fn on_bar(&mut self, _candle: &Candle, _broker: &mut dyn Broker) -> StrategyResult<()> {
        Ok(())
    }

    /// Bid/ask update
    fn on_tick(&mut self, quote: &Quote, broker: &mut dyn Broker) -> StrategyResult<()>;

    fn on_position_opened(
        &mut self,
        _position: &Position,
        _broker: &mut dyn Broker,
    ) -> StrategyResult<()> {
        Ok(())
    }

    fn on_position_closed(
        &mut self,
        _position: &Position,
        _broker: &mut dyn Broker,
    ) -> StrategyResult<()> {
        Ok(())
    }

    fn on_pending_filled(
        &mut self,
        _order: &PendingOrder,
        _broker: &mut dyn Broker,
    ) -> StrategyResult<()> {
        Ok(())
    }

    /// Cancellations never change strategy state
    fn on_pending_cancelled(&mut self, order: &PendingOrder, reason: &str) {
        info!(
            order = order.id,
            side = %order.side,
            trigger = order.target_price,
            reason,
            "Pending order cancelled"
        );
    }

    fn on_command(
        &mut self,
        command: &ManualCommand,
        broker: &mut dyn Broker,
    ) -> StrategyResult<()> {
        execute_command(
            self.label(),
            self.instrument(),
            self.volume_rounding(),
            command,
            broker,
        )
    }

    /// Route one event to its callback after label/instrument scoping
    fn handle(&mut self, event: &StrategyEvent, broker: &mut dyn Broker) -> StrategyResult<()> {
        if !event.is_for(self.label(), &self.instrument().symbol) {
            return Err(StrategyError::StaleEventIgnored {
                label: event.label().unwrap_or(self.label()).to_string(),
                symbol: event
                    .symbol()
                    .cloned()
                    .unwrap_or_else(|| self.instrument().symbol.clone()),
            });
        }

        match event {
            StrategyEvent::Bar { candle, .. } => self.on_bar(candle, broker),
            StrategyEvent::Tick(quote) => self.on_tick(quote, broker),
            StrategyEvent::PositionOpened(p) => self.on_position_opened(p, broker),
            StrategyEvent::PositionClosed(p) => self.on_position_closed(p, broker),
            StrategyEvent::PendingOrderFilled(o) => self.on_pending_filled(o, broker),
            StrategyEvent::PendingOrderCancelled { order, reason } => {
                self.on_pending_cancelled(order, reason);
                Ok(())
            }
            StrategyEvent::Command(command) => self.on_command(command, broker),
        }
    }
}

/// Apply an operator command for one label/instrument
pub fn execute_command(
    label: &str,
    instrument: &InstrumentSpec,
    rounding: RoundingMode,
    command: &ManualCommand,
    broker: &mut dyn Broker,
) -> StrategyResult<()> {
    let symbol = &instrument.symbol;
    match command {
        ManualCommand::Open { side, lots } => {
            if *lots <= 0.0 {
                warn!(lots, "Manual open ignored: volume must be positive");
                return Ok(());
            }
            let volume = instrument.normalize_volume(*lots, rounding);
            let request = OrderRequest::market(*side, symbol.clone(), volume, label);
            match broker.place_order(&request) {
                Ok(ticket) => {
                    info!(%request, ?ticket, "Manual order placed");
                    Ok(())
                }
                Err(e) => {
                    warn!(%request, error = %e, "Manual order rejected");
                    Err(e.into())
                }
            }
        }
        ManualCommand::CloseAll => {
            let closed = broker.close_all(label, symbol);
            let cancelled = broker.cancel_all_pending(label, symbol);
            info!(closed, cancelled, "Manual close all");
            Ok(())
        }
        ManualCommand::CancelPending => {
            let cancelled = broker.cancel_all_pending(label, symbol);
            info!(cancelled, "Manual cancel pending");
            Ok(())
        }
    }
}

// =============================================================================
// Strategy Factory - Type alias for strategy constructor functions
// =============================================================================

/// Factory function type for creating strategies from config
pub type StrategyFactory = fn(&Config) -> Result<Box<dyn Strategy>>;

// =============================================================================
// Strategy Registry - Dynamic registration without hardcoding
// =============================================================================

/// Global strategy registry
static REGISTRY: OnceLock<RwLock<HashMap<&'static str, StrategyFactory>>> = OnceLock::new();

fn get_registry() -> &'static RwLock<HashMap<&'static str, StrategyFactory>> {
    REGISTRY.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("trend_channel", trend_channel::create as StrategyFactory);
        map.insert("hedge_grid", hedge_grid::create as StrategyFactory);
        RwLock::new(map)
    })
}

/// Create a strategy from configuration
pub fn create_strategy(config: &Config) -> Result<Box<dyn Strategy>> {
    let registry = get_registry()
        .read()
        .map_err(|_| anyhow::anyhow!("strategy registry lock poisoned"))?;

    let factory = registry.get(config.strategy_name.as_str()).ok_or_else(|| {
        let mut available: Vec<_> = registry.keys().copied().collect();
        available.sort_unstable();
        anyhow::anyhow!(
            "Unknown strategy: '{}'. Available: {}",
            config.strategy_name,
            available.join(", ")
        )
    })?;

    factory(config)
}

/// Get list of available strategy names
pub fn available_strategies() -> Vec<&'static str> {
    let mut names: Vec<_> = get_registry()
        .read()
        .map(|r| r.keys().copied().collect())
        .unwrap_or_default();
    names.sort_unstable();
    names
}

/// Register a new strategy (for plugins or testing)
pub fn register_strategy(name: &'static str, factory: StrategyFactory) -> Result<()> {
    get_registry()
        .write()
        .map_err(|_| anyhow::anyhow!("strategy registry lock poisoned"))?
        .insert(name, factory);
    Ok(())
}
