//! # Resource Broker
//!
//! > **Shared and exclusive leases on named resources, over TCP.**
//!
//! A broker owns a set of resources (build machines, licences, test devices),
//! each with a number of parallel slots. Clients ask for *any* resource carrying
//! a keyword; the broker grants a slot, or the whole resource for an exclusive
//! request, and blocks the caller until one is available.
//!
//! ## Module Tour
//!
//! ### 1. The Engine ([`broker_core`])
//! The locking engine lives in its own crate. [`Resource`](broker_core::Resource)
//! counts slots and arbitrates exclusive access;
//! [`ResourceManager`](broker_core::ResourceManager) maps keywords to resources
//! and schedules waiting requests.
//!
//! ### 2. The Wire ([`protocol`])
//! Length-prefixed JSON frames and the typed [`Command`](protocol::Command) /
//! [`Answer`](protocol::Answer) messages.
//!
//! ### 3. The Front Door ([`server`], [`commands`])
//! One task per connection; each decoded command runs through the
//! [`CommandHandler`](commands::CommandHandler), which turns every failure into
//! an error answer.
//!
//! ### 4. The Interface ([`client`])
//! [`BrokerApi`](client::BrokerApi) gives typed `acquire`/`release`/`status_list`
//! calls over TCP ([`BrokerClient`](client::BrokerClient)) or in-process
//! ([`LocalBroker`](client::LocalBroker)).
//!
//! ### 5. The Orchestrator ([`lifecycle`])
//! [`BrokerSystem`](lifecycle::BrokerSystem) wires everything together from a
//! [`BrokerConfig`](config::BrokerConfig) and shuts it down again.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=info cargo run -- --config broker.toml
//! cargo run --bin broker-client -- --user alice acquire build
//! ```

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod protocol;
pub mod server;

pub use broker_core;
