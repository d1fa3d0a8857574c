//! Strategy event runner
//!
//! Single-threaded consumer of [`StrategyEvent`] messages. Each message is
//! handed to the strategy; lifecycle events the broker produced meanwhile
//! (fills, opens, closes) are drained and handled in order before the next
//! message is taken. Errors are logged and counted, never fatal.

use std::collections::VecDeque;
use std::sync::mpsc::Receiver;

use tracing::{debug, info, warn};

use crate::error::StrategyError;
use crate::oms::{Broker, StrategyEvent};
use crate::strategies::Strategy;

/// Counters over everything a runner handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub handled: usize,
    pub ignored: usize,
    pub failed: usize,
}

pub struct StrategyRunner<S: Strategy + ?Sized, B: Broker> {
    strategy: Box<S>,
    broker: B,
    stats: RunStats,
}

impl<S: Strategy + ?Sized, B: Broker> StrategyRunner<S, B> {
    pub fn new(strategy: Box<S>, broker: B) -> Self {
        Self {
            strategy,
            broker,
            stats: RunStats::default(),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    pub fn into_parts(self) -> (Box<S>, B) {
        (self.strategy, self.broker)
    }

    /// Rediscover broker state, then handle anything the broker queued
    pub fn start(&mut self) {
        self.strategy.on_start(&mut self.broker);
        let queued = self.broker.drain_events();
        for event in queued {
            self.dispatch(event);
        }
    }

    /// Handle one external event plus every broker event it caused.
    ///
    /// Returns how many events were handed to the strategy.
    pub fn dispatch(&mut self, event: StrategyEvent) -> usize {
        // Broker events raised before this message go first
        let mut queue: VecDeque<StrategyEvent> = self.broker.drain_events().into();
        queue.push_back(event);

        let mut count = 0;
        while let Some(event) = queue.pop_front() {
            self.process(&event);
            count += 1;
            queue.extend(self.broker.drain_events());
        }
        count
    }

    fn process(&mut self, event: &StrategyEvent) {
        match self.strategy.handle(event, &mut self.broker) {
            Ok(()) => self.stats.handled += 1,
            Err(StrategyError::StaleEventIgnored { label, symbol }) => {
                self.stats.ignored += 1;
                debug!(%label, %symbol, "Event for another session ignored");
            }
            Err(e) => {
                self.stats.failed += 1;
                warn!(strategy = self.strategy.name(), error = %e, "Event handling failed");
            }
        }
    }

    /// Consume events until every sender is dropped
    pub fn run(&mut self, events: Receiver<StrategyEvent>) -> RunStats {
        self.start();
        for event in events.iter() {
            self.dispatch(event);
        }
        info!(
            strategy = self.strategy.name(),
            handled = self.stats.handled,
            ignored = self.stats.ignored,
            failed = self.stats.failed,
            "Event stream closed"
        );
        self.stats
    }
}
