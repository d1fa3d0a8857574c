//! Command implementations

pub mod channels;
pub mod check;
