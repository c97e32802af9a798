//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the global `tracing` subscriber used by the
//! broker binary.
//!
//! ## Configuration
//!
//! Output uses the compact format without module paths (`with_target(false)`);
//! the structured fields (`resource`, `user`, `keyword`, `peer`) carry the
//! context instead. The filter comes from `RUST_LOG` when it is set and from
//! `[logging] filter` in the config file otherwise.
//!
//! ```bash
//! # Lease grants and releases
//! RUST_LOG=info resource-broker --config broker.toml
//!
//! # Every wait, wake-up and connection
//! RUST_LOG=debug resource-broker --config broker.toml
//!
//! # Only the locking engine
//! RUST_LOG=broker_core=debug resource-broker --config broker.toml
//! ```
//!
//! ## What Gets Traced
//!
//! - **Loading**: every definition file read, skipped or rejected
//! - **Leases**: grants and releases with `user`, `resource` and `exclusive`
//! - **Waiting**: blocked acquires and their wake-ups (debug)
//! - **Connections**: one span per connection carrying the `peer` address
//!
//! A typical session at `info`:
//!
//! ```text
//! INFO Loading resources dir=resources
//! INFO ResourceManager ready resources=3 keywords=4
//! INFO Broker listening address=Some(127.0.0.1:4224)
//! INFO serve_connection:handle: Acquired peer=127.0.0.1:51234 cmd="acquire" resource=build01 user="alice" exclusive=false free=1
//! INFO serve_connection:handle: Released peer=127.0.0.1:51240 cmd="release" resource=build01 user="alice" exclusive=false free=2
//! ```

use tracing_subscriber::EnvFilter;

/// Installs the subscriber. Calling it a second time is a no-op.
pub fn setup_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
