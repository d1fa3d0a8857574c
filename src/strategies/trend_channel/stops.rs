//! Protective Stop Adjuster
//!
//! Break-even and trailing stops. A stop only ever tightens: higher for a
//! long, lower for a short. Both candidates are merged so each position gets
//! at most one modify request per tick, and none when nothing improves.

use tracing::{info, warn};

use crate::oms::{Broker, Position};
use crate::{InstrumentSpec, Quote, Side};

use super::config::TrendChannelConfig;

/// Whether `candidate` strictly improves on `current` for a position on `side`
pub fn is_tighter(side: Side, candidate: f64, current: Option<f64>) -> bool {
    match current {
        None => true,
        Some(stop) => match side {
            Side::Buy => candidate > stop,
            Side::Sell => candidate < stop,
        },
    }
}

pub struct ProtectiveStopAdjuster<'a> {
    config: &'a TrendChannelConfig,
    instrument: &'a InstrumentSpec,
}

impl<'a> ProtectiveStopAdjuster<'a> {
    pub fn new(config: &'a TrendChannelConfig, instrument: &'a InstrumentSpec) -> Self {
        Self { config, instrument }
    }

    pub fn is_active(&self) -> bool {
        self.config.use_break_even || self.config.use_trailing_stop
    }

    fn break_even(&self, position: &Position) -> Option<f64> {
        (self.config.use_break_even && position.net_profit >= self.config.break_even_profit)
            .then_some(position.entry_price)
    }

    fn trailing(&self, position: &Position, quote: &Quote) -> Option<f64> {
        if !self.config.use_trailing_stop || position.net_profit < self.config.trailing_stop_activation {
            return None;
        }
        let distance = self
            .instrument
            .pips_to_price(self.config.trailing_stop_distance_pips);
        Some(match position.side {
            Side::Buy => quote.bid - distance,
            Side::Sell => quote.ask + distance,
        })
    }

    /// New stop for a position, if any candidate tightens the current one
    pub fn next_stop(&self, position: &Position, quote: &Quote) -> Option<f64> {
        [self.break_even(position), self.trailing(position, quote)]
            .into_iter()
            .flatten()
            .filter(|&stop| is_tighter(position.side, stop, position.stop_loss))
            .reduce(|a, b| if is_tighter(position.side, b, Some(a)) { b } else { a })
    }

    /// Request stop tightening for every position of the session; returns modifies sent
    pub fn adjust(&self, label: &str, quote: &Quote, broker: &mut dyn Broker) -> usize {
        if !self.is_active() {
            return 0;
        }
        let mut modified = 0;
        for position in broker.open_positions(label, &self.instrument.symbol) {
            let Some(stop) = self.next_stop(&position, quote) else {
                continue;
            };
            match broker.modify_position(&position, Some(stop), position.take_profit) {
                Ok(()) => {
                    modified += 1;
                    info!(
                        position = position.id,
                        side = %position.side,
                        old_stop = ?position.stop_loss,
                        new_stop = stop,
                        "Stop tightened"
                    );
                }
                Err(e) => warn!(position = position.id, new_stop = stop, error = %e, "Stop modify rejected"),
            }
        }
        modified
    }
}
