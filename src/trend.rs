//! Trend classification from the short and long band pairs

use serde::{Deserialize, Serialize};

use crate::channel::{Bands, ChannelEngine, ChannelKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendState {
    Up,
    Down,
    Neutral,
}

impl TrendState {
    /// Up when both short bands are strictly above both long bands, Down when
    /// both are strictly below, Neutral otherwise (including ties).
    pub fn classify(short: Bands, long: Bands) -> TrendState {
        if short.low > long.low && short.high > long.high {
            TrendState::Up
        } else if short.low < long.low && short.high < long.high {
            TrendState::Down
        } else {
            TrendState::Neutral
        }
    }

    /// Classify at `index`; Neutral while either pair is undefined there
    pub fn at(engine: &ChannelEngine, index: usize) -> TrendState {
        match (
            engine.bands_at(ChannelKind::Short, index),
            engine.bands_at(ChannelKind::Long, index),
        ) {
            (Ok(short), Ok(long)) => TrendState::classify(short, long),
            _ => TrendState::Neutral,
        }
    }
}

impl std::fmt::Display for TrendState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendState::Up => write!(f, "UP"),
            TrendState::Down => write!(f, "DOWN"),
            TrendState::Neutral => write!(f, "NEUTRAL"),
        }
    }
}
