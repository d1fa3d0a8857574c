//! In-memory hedge session state
//!
//! One per label/instrument. Lost on restart: a restarted strategy begins
//! `Idle` even if the broker still holds positions from an earlier ladder.

use serde::Serialize;

use crate::Side;

use super::config::HedgeGridConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum GridState {
    /// Nothing tracked
    #[default]
    Idle,
    /// First position open, first hedge stop resting
    InitialOpen,
    /// At least one hedge stop filled
    Hedged,
}

impl std::fmt::Display for GridState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridState::Idle => write!(f, "idle"),
            GridState::InitialOpen => write!(f, "initial"),
            GridState::Hedged => write!(f, "hedged"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HedgeSession {
    state: GridState,
    /// Lots of the next rung, unrounded
    next_volume: f64,
    last_side: Option<Side>,
}

impl HedgeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GridState {
        self.state
    }

    pub fn next_volume(&self) -> f64 {
        self.next_volume
    }

    /// Side of the most recently opened session position
    pub fn last_side(&self) -> Option<Side> {
        self.last_side
    }

    pub fn is_triggered(&self) -> bool {
        self.state == GridState::Hedged
    }

    pub fn record_open(&mut self, side: Side) {
        self.last_side = Some(side);
    }

    /// Commit the first rung after a successful hedge placement
    pub fn commit_initial(&mut self, next_volume: f64) {
        self.state = GridState::InitialOpen;
        self.next_volume = next_volume;
    }

    /// Commit a ladder step after a successful hedge placement
    pub fn commit_hedged(&mut self, next_volume: f64) {
        self.state = GridState::Hedged;
        self.next_volume = next_volume;
    }

    pub fn reset(&mut self) {
        self.state = GridState::Idle;
        self.next_volume = 0.0;
    }

    /// Aggregate profit that closes the session in its current state
    pub fn profit_target(&self, config: &HedgeGridConfig) -> f64 {
        match self.state {
            GridState::Hedged => config.hedge_profit_target_usd,
            GridState::Idle | GridState::InitialOpen => config.initial_profit_target_usd,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = HedgeSession::new();
        assert_eq!(session.state(), GridState::Idle);
        assert_eq!(session.next_volume(), 0.0);
        assert!(!session.is_triggered());
        assert_eq!(session.last_side(), None);
    }

    #[test]
    fn test_commit_and_reset() {
        let mut session = HedgeSession::new();
        session.record_open(Side::Buy);
        session.commit_initial(0.2);
        assert_eq!(session.state(), GridState::InitialOpen);
        session.commit_hedged(0.4);
        assert!(session.is_triggered());
        assert_eq!(session.next_volume(), 0.4);

        session.reset();
        assert_eq!(session.state(), GridState::Idle);
        assert_eq!(session.next_volume(), 0.0);
    }

    #[test]
    fn test_profit_target_by_state() {
        let config = HedgeGridConfig {
            initial_profit_target_usd: 40.0,
            hedge_profit_target_usd: 5.0,
            ..Default::default()
        };
        let mut session = HedgeSession::new();
        assert_eq!(session.profit_target(&config), 40.0);
        session.commit_initial(0.2);
        assert_eq!(session.profit_target(&config), 40.0);
        session.commit_hedged(0.4);
        assert_eq!(session.profit_target(&config), 5.0);
    }
}
