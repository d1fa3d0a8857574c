//! Order Management System (OMS)
//!
//! Interface to the execution collaborator that owns positions and pending
//! orders:
//! - Position / pending order snapshots scoped by label and instrument
//! - Market and stop order requests with synchronous success or rejection
//! - Lifecycle events and operator commands as typed messages
//! - An in-memory broker for tests and dry runs

pub mod broker;
pub mod events;
pub mod memory;
pub mod request;
pub mod types;

// Re-export core types
pub use broker::{Broker, BrokerAction, BrokerResult, OrderRejected, OrderTicket};
pub use events::{ManualCommand, StrategyEvent};
pub use memory::{BrokerRequest, InMemoryBroker};
pub use request::OrderRequest;
pub use types::{total_net_profit, OrderId, OrderType, PendingOrder, Position, PositionId};
