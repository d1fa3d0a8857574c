//! Trend Channel Strategy - tick pipeline
//!
//! Bars feed the channel engine. Every tick runs, in order: per-position
//! exits, the portfolio exit (global mode), stop tightening, then entry
//! evaluation in the direction of the current trend.

use tracing::debug;

use crate::channel::ChannelEngine;
use crate::error::StrategyResult;
use crate::oms::Broker;
use crate::strategies::Strategy;
use crate::trend::TrendState;
use crate::{Candle, InstrumentSpec, Quote, RoundingMode, Side};

use super::config::{SlTpMode, TrendChannelConfig};
use super::exits::ExitRuleEvaluator;
use super::lifecycle::PositionLifecycleManager;
use super::signals::EntrySignalEvaluator;
use super::stops::ProtectiveStopAdjuster;

pub struct TrendChannelStrategy {
    label: String,
    instrument: InstrumentSpec,
    config: TrendChannelConfig,
    engine: ChannelEngine,
}

impl TrendChannelStrategy {
    pub fn new(
        label: impl Into<String>,
        instrument: InstrumentSpec,
        config: TrendChannelConfig,
    ) -> StrategyResult<Self> {
        let engine = ChannelEngine::new(config.short_period, config.long_period)?;
        Ok(Self {
            label: label.into(),
            instrument,
            config,
            engine,
        })
    }

    pub fn config(&self) -> &TrendChannelConfig {
        &self.config
    }

    pub fn engine(&self) -> &ChannelEngine {
        &self.engine
    }

    /// Trend at the newest bar, Neutral until enough history exists
    pub fn current_trend(&self) -> TrendState {
        self.engine
            .signal_index()
            .map_or(TrendState::Neutral, |index| TrendState::at(&self.engine, index))
    }

    fn entry_side(&self, index: usize) -> Option<Side> {
        let side = match TrendState::at(&self.engine, index) {
            TrendState::Up => Side::Buy,
            TrendState::Down => Side::Sell,
            TrendState::Neutral => return None,
        };
        if !self.config.trade_direction.allows(side) {
            return None;
        }
        EntrySignalEvaluator::new(&self.engine)
            .evaluate(self.config.opening_method, side, index)
            .then_some(side)
    }
}

impl Strategy for TrendChannelStrategy {
    fn name(&self) -> &'static str {
        "trend_channel"
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

    fn on_bar(&mut self, candle: &Candle, _broker: &mut dyn Broker) -> StrategyResult<()> {
        candle.validate()?;
        self.engine.update(candle.clone())?;
        debug!(
            bars = self.engine.len(),
            close = candle.close,
            trend = %self.current_trend(),
            "Bar appended"
        );
        Ok(())
    }

    fn on_tick(&mut self, quote: &Quote, broker: &mut dyn Broker) -> StrategyResult<()> {
        let index = self.engine.signal_index();
        let symbol = &self.instrument.symbol;

        let exits = ExitRuleEvaluator::new(&self.config, &self.engine);
        exits.close_matching(&self.label, symbol, index, broker);
        if self.config.sltp_mode == SlTpMode::Global {
            exits.close_portfolio(&self.label, symbol, broker);
        }

        ProtectiveStopAdjuster::new(&self.config, &self.instrument).adjust(&self.label, quote, broker);

        let Some(index) = index else {
            return Ok(());
        };
        let Some(side) = self.entry_side(index) else {
            return Ok(());
        };
        debug!(%side, index, "Entry signal");
        PositionLifecycleManager::new(&self.config, &self.instrument, &self.label)
            .try_open(side, quote, broker)?;
        Ok(())
    }
}
