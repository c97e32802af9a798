//! # Broker Core
//!
//! This crate is the concurrency engine of the resource broker. Clients ask for
//! a resource by *keyword*; the engine hands out shared or exclusive leases on
//! a matching resource and takes them back on release.
//!
//! ## Architecture Overview
//!
//! 1. **Definition Layer** ([`ResourceDefinition`]) - one JSON document per resource
//! 2. **Lock Layer** ([`Resource`]) - slot counting and exclusive arbitration for one resource
//! 3. **Scheduling Layer** ([`ResourceManager`]) - keyword lookup, scan-and-retry, shutdown
//!
//! ## Example
//!
//! ```rust
//! use broker_core::{Resource, ResourceDefinition, ResourceManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let build01 = Resource::from_definition(
//!         ResourceDefinition::new("build01", 2).with_keywords(["build"]),
//!     )
//!     .unwrap();
//!     let manager = ResourceManager::new([build01]);
//!
//!     let granted = manager.acquire("alice", "build", false).await;
//!     assert_eq!(granted.as_deref(), Some("build01"));
//!
//!     manager.release("build01", "alice", false).unwrap();
//!     manager.shutdown();
//! }
//! ```
//!
//! ## Concurrency Model
//!
//! - Every [`Resource`] guards its counters with its own mutex; the lock is
//!   never held across an `.await`.
//! - Waiting is done on `tokio::sync::Notify`, so a blocked acquire parks its
//!   task instead of a thread.
//! - There is no FIFO fairness between waiters. Whoever wins the resource lock
//!   after a wake-up gets the slot.
//! - The only way out of a blocked acquire is a release, a capacity change or
//!   a shutdown. Dropping the future cancels the wait without side effects;
//!   an abandoned exclusive wait stops holding back shared requests.

pub mod definition;
pub mod error;
pub mod manager;
pub mod resource;

pub use definition::ResourceDefinition;
pub use error::{DefinitionError, ResourceError};
pub use manager::ResourceManager;
pub use resource::{Resource, ResourceStatus};
