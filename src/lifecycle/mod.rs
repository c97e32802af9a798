//! Start-up and shutdown of the broker.

mod broker_system;
pub mod tracing;

pub use broker_system::BrokerSystem;
