//! # Resource
//!
//! A [`Resource`] is a single lockable entity with `parallel_count` slots.
//! Shared leases take one slot each; an exclusive lease takes all of them and
//! is only granted while the resource is completely idle.
//!
//! ## Locking Model
//!
//! Each resource owns a `parking_lot::Mutex` around its counters and a
//! `tokio::sync::Notify` that is signalled on every release, resize and
//! shutdown. A blocking [`Resource::acquire`] follows the monitor pattern:
//!
//! 1. Register interest in the next notification.
//! 2. Check the grant condition under the lock.
//! 3. Drop the lock and wait.
//! 4. Loop back to step 1.
//!
//! Interest is registered *before* the check, so a release that lands between
//! the check and the wait still wakes the caller. The mutex is never held
//! across an `.await`.
//!
//! ## Exclusive Waiters
//!
//! While a blocking exclusive request is waiting, `wait_for_exclusive` is set
//! and new shared requests are refused even if slots are free. This lets the
//! shared holders drain so the exclusive request can proceed.

use crate::definition::ResourceDefinition;
use crate::error::{DefinitionError, ResourceError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Point-in-time view of a resource, as reported to clients.
///
/// `parameters` is only filled in for detail requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub name: String,
    pub keywords: Vec<String>,
    pub slots: i64,
    pub free: i64,
    pub users: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

#[derive(Debug)]
struct SlotState {
    parallel_count: i64,
    current_count: i64,
    users: Vec<String>,
    exclusive: bool,
    wait_for_exclusive: bool,
    run: bool,
}

impl SlotState {
    fn must_wait(&self, exclusive: bool) -> bool {
        self.current_count <= 0
            || (self.wait_for_exclusive && !exclusive)
            || (exclusive && self.current_count != self.parallel_count)
    }

    fn grant(&mut self, user: &str, exclusive: bool) {
        if exclusive {
            self.current_count = 0;
            self.exclusive = true;
            self.wait_for_exclusive = false;
        } else {
            self.current_count -= 1;
        }
        self.users.push(user.to_string());
    }
}

/// A lockable entity with a fixed number of parallel slots.
#[derive(Debug)]
pub struct Resource {
    name: String,
    keywords: Vec<String>,
    parameters: Map<String, Value>,
    state: Mutex<SlotState>,
    released: Notify,
}

impl Resource {
    /// Creates a resource with `parallel_count` slots, no extra keywords and no parameters.
    pub fn new(name: impl Into<String>, parallel_count: i64) -> Result<Self, DefinitionError> {
        Self::from_definition(ResourceDefinition::new(name, parallel_count))
    }

    /// Builds a resource from a definition.
    ///
    /// The keyword list starts with the lowercased name followed by the
    /// lowercased supplied keywords. Duplicates are logged and dropped.
    pub fn from_definition(definition: ResourceDefinition) -> Result<Self, DefinitionError> {
        if definition.parallel_count <= 0 {
            return Err(DefinitionError::InvalidField {
                field: "parallel_count",
                reason: format!("must be greater than zero, got {}", definition.parallel_count),
            });
        }

        let mut keywords = vec![definition.name.to_lowercase()];
        for keyword in definition.keywords {
            let keyword = keyword.to_lowercase();
            if keywords.contains(&keyword) {
                warn!(resource = %definition.name, %keyword, "Duplicate keyword ignored");
                continue;
            }
            keywords.push(keyword);
        }

        Ok(Self {
            name: definition.name,
            keywords,
            parameters: definition.parameters,
            state: Mutex::new(SlotState {
                parallel_count: definition.parallel_count,
                current_count: definition.parallel_count,
                users: Vec::new(),
                exclusive: false,
                wait_for_exclusive: false,
                run: true,
            }),
            released: Notify::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    pub fn parallel_count(&self) -> i64 {
        self.state.lock().parallel_count
    }

    pub fn current_count(&self) -> i64 {
        self.state.lock().current_count
    }

    pub fn users(&self) -> Vec<String> {
        self.state.lock().users.clone()
    }

    pub fn is_exclusive(&self) -> bool {
        self.state.lock().exclusive
    }

    pub fn is_waiting_for_exclusive(&self) -> bool {
        self.state.lock().wait_for_exclusive
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().run
    }

    /// Takes a consistent snapshot of the counters and holders.
    pub fn status(&self, with_parameters: bool) -> ResourceStatus {
        let state = self.state.lock();
        ResourceStatus {
            name: self.name.clone(),
            keywords: self.keywords.clone(),
            slots: state.parallel_count,
            free: state.current_count,
            users: state.users.clone(),
            parameters: with_parameters.then(|| self.parameters.clone()),
        }
    }

    /// Acquires one slot (or all of them when `exclusive`) for `user`.
    ///
    /// With `block == false` this never waits and behaves like
    /// [`Resource::try_acquire`]. With `block == true` it waits for releases
    /// until the lease can be granted. Returns `false` if the resource is or
    /// gets shut down before the lease is granted.
    pub async fn acquire(&self, user: &str, exclusive: bool, block: bool) -> bool {
        let mut exclusive_wait: Option<ExclusiveWait<'_>> = None;
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            {
                let mut state = self.state.lock();
                if !state.run {
                    debug!(resource = %self.name, user, "Acquire rejected, shutting down");
                    return false;
                }
                if !state.must_wait(exclusive) {
                    state.grant(user, exclusive);
                    if let Some(wait) = exclusive_wait.as_mut() {
                        wait.granted = true;
                    }
                    info!(resource = %self.name, user, exclusive, free = state.current_count, "Acquired");
                    return true;
                }
                if !block {
                    return false;
                }
                if exclusive {
                    state.wait_for_exclusive = true;
                    exclusive_wait.get_or_insert(ExclusiveWait {
                        resource: self,
                        granted: false,
                    });
                }
                debug!(resource = %self.name, user, exclusive, "Waiting for release");
            }

            released.await;
        }
    }

    /// Non-blocking acquire.
    pub fn try_acquire(&self, user: &str, exclusive: bool) -> bool {
        let mut state = self.state.lock();
        if !state.run || state.must_wait(exclusive) {
            return false;
        }
        state.grant(user, exclusive);
        info!(resource = %self.name, user, exclusive, free = state.current_count, "Acquired");
        true
    }

    /// Releases a lease held by `user`.
    ///
    /// An exclusive release only drops the exclusive mode: the user keeps one
    /// shared slot and stays in the holder list until a normal release. A
    /// normal release of an exclusively held resource frees it completely.
    pub fn release(&self, user: &str, exclusive: bool) -> Result<(), ResourceError> {
        {
            let mut state = self.state.lock();
            let Some(position) = state.users.iter().position(|holder| holder == user) else {
                warn!(resource = %self.name, user, "Release by a user that holds no lease");
                return Err(ResourceError::NotHeld {
                    resource: self.name.clone(),
                    user: user.to_string(),
                });
            };

            if exclusive {
                if !state.exclusive {
                    warn!(resource = %self.name, user, "Exclusive release of a shared lease");
                    return Err(ResourceError::NotExclusive(self.name.clone()));
                }
                state.current_count = state.parallel_count - 1;
                state.exclusive = false;
            } else {
                state.users.remove(position);
                if state.exclusive {
                    state.current_count = state.parallel_count;
                    state.exclusive = false;
                } else {
                    state.current_count += 1;
                }
            }
            info!(resource = %self.name, user, exclusive, free = state.current_count, "Released");
        }

        self.released.notify_waiters();
        Ok(())
    }

    /// Changes the capacity while keeping the number of outstanding leases.
    ///
    /// Shrinking below the outstanding count leaves `current_count` negative
    /// until enough leases are released.
    pub fn set_parallel_count(&self, value: i64) -> Result<(), ResourceError> {
        if value <= 0 {
            return Err(ResourceError::InvalidParallelCount {
                resource: self.name.clone(),
                value,
            });
        }

        {
            let mut state = self.state.lock();
            if state.exclusive {
                // the exclusive release recomputes current_count from the new capacity
                state.parallel_count = value;
            } else {
                let outstanding = state.parallel_count - state.current_count;
                state.parallel_count = value;
                state.current_count = value - outstanding;
            }
            info!(resource = %self.name, slots = value, free = state.current_count, "Capacity changed");
        }

        self.released.notify_waiters();
        Ok(())
    }

    /// Stops granting leases and wakes every waiter.
    pub fn do_shutdown(&self) {
        self.state.lock().run = false;
        self.released.notify_waiters();
        debug!(resource = %self.name, "Shutdown");
    }
}

/// Held by a blocking exclusive acquire while it waits.
///
/// If the wait ends without a grant (shutdown, or the future is dropped) the
/// `wait_for_exclusive` flag is cleared and the waiters blocked behind it are
/// woken. Another exclusive waiter still pending sets the flag again on its
/// next check.
struct ExclusiveWait<'a> {
    resource: &'a Resource,
    granted: bool,
}

impl Drop for ExclusiveWait<'_> {
    fn drop(&mut self) {
        if self.granted {
            return;
        }
        self.resource.state.lock().wait_for_exclusive = false;
        debug!(resource = %self.resource.name, "Exclusive wait abandoned");
        self.resource.released.notify_waiters();
    }
}
