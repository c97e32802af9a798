//! # Resource Manager
//!
//! The [`ResourceManager`] owns every [`Resource`] of a broker, indexes them by
//! keyword and hands out leases for "any resource matching this keyword".
//!
//! ## Scan-and-Retry
//!
//! [`ResourceManager::acquire`] never blocks on a single resource. It probes
//! every resource registered under the keyword with a non-blocking acquire and
//! takes the first grant. When nothing is free it waits on one `Notify` shared
//! by all scanners; every release (and shutdown) wakes all of them, and each
//! rescans. Wake-ups are coarse on purpose: a scanner is never tied to one
//! resource instance while another one with the same keyword frees up.
//!
//! ## Loading
//!
//! [`ResourceManager::load`] reads one definition per file from a directory.
//! Hidden files (leading `.`) and backups (trailing `bkp`) are skipped, as are
//! files that fail to parse and files that redefine an existing name. None of
//! this aborts start-up; every skipped file is logged.

use crate::definition::ResourceDefinition;
use crate::error::ResourceError;
use crate::resource::{Resource, ResourceStatus};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

pub struct ResourceManager {
    resources: BTreeMap<String, Resource>,
    keywords: HashMap<String, Vec<String>>,
    run: AtomicBool,
    released: Notify,
}

impl ResourceManager {
    /// Builds a manager from already constructed resources.
    ///
    /// A resource whose name is already taken is logged and dropped.
    pub fn new(resources: impl IntoIterator<Item = Resource>) -> Self {
        let mut by_name = BTreeMap::new();
        for resource in resources {
            if by_name.contains_key(resource.name()) {
                warn!(resource = resource.name(), "A resource with this name already exists, ignoring it");
                continue;
            }
            by_name.insert(resource.name().to_string(), resource);
        }

        let keywords = build_keyword_index(&by_name);
        info!(resources = by_name.len(), keywords = keywords.len(), "ResourceManager ready");

        Self {
            resources: by_name,
            keywords,
            run: AtomicBool::new(true),
            released: Notify::new(),
        }
    }

    /// Loads every resource definition file found in `dir`.
    ///
    /// A missing directory produces an empty manager.
    pub fn load(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        info!(dir = %dir.display(), "Loading resources");
        Self::new(load_resources(dir))
    }

    /// Acquires a lease on any resource registered under `keyword`.
    ///
    /// Returns the name of the granted resource, or `None` if the keyword is
    /// unknown (immediately) or the manager shuts down while waiting.
    pub async fn acquire(&self, user: &str, keyword: &str, exclusive: bool) -> Option<String> {
        let keyword = keyword.to_lowercase();
        let Some(names) = self.keywords.get(&keyword) else {
            warn!(user, %keyword, "No resource registered for keyword");
            return None;
        };

        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if !self.is_running() {
                debug!(user, %keyword, "Acquire rejected, shutting down");
                return None;
            }

            for name in names {
                if let Some(resource) = self.resources.get(name) {
                    if resource.try_acquire(user, exclusive) {
                        return Some(name.clone());
                    }
                }
            }

            debug!(user, %keyword, exclusive, "All matching resources busy, waiting");
            released.await;
        }
    }

    /// Releases a lease and wakes every scanning waiter.
    pub fn release(&self, resource_name: &str, user: &str, exclusive: bool) -> Result<(), ResourceError> {
        let resource = self.get(resource_name)?;
        let result = resource.release(user, exclusive);
        self.released.notify_waiters();
        result
    }

    /// Changes the capacity of a resource and wakes every scanning waiter.
    pub fn set_parallel_count(&self, resource_name: &str, value: i64) -> Result<(), ResourceError> {
        self.get(resource_name)?.set_parallel_count(value)?;
        self.released.notify_waiters();
        Ok(())
    }

    /// Rejects all further requests and wakes every waiter.
    pub fn shutdown(&self) {
        info!("Shutting down ResourceManager");
        self.run.store(false, Ordering::SeqCst);
        self.released.notify_waiters();
        for resource in self.resources.values() {
            resource.do_shutdown();
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.load(Ordering::SeqCst)
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// All resources, ordered by name.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Names registered under `keyword`, in scan order.
    pub fn names_for_keyword(&self, keyword: &str) -> &[String] {
        self.keywords
            .get(&keyword.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn status_list(&self) -> Vec<ResourceStatus> {
        self.resources().map(|resource| resource.status(false)).collect()
    }

    pub fn resource_details(&self, name: &str) -> Result<ResourceStatus, ResourceError> {
        Ok(self.get(name)?.status(true))
    }

    fn get(&self, name: &str) -> Result<&Resource, ResourceError> {
        self.resources
            .get(name)
            .ok_or_else(|| ResourceError::NotFound(name.to_string()))
    }
}

fn build_keyword_index(resources: &BTreeMap<String, Resource>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for resource in resources.values() {
        for keyword in resource.keywords() {
            let names = index.entry(keyword.clone()).or_default();
            if names.iter().any(|name| name == resource.name()) {
                warn!(resource = resource.name(), %keyword, "Keyword registered twice");
                continue;
            }
            names.push(resource.name().to_string());
        }
    }
    index
}

fn is_ignored(file_name: &str) -> bool {
    file_name.starts_with('.') || file_name.ends_with("bkp")
}

fn load_resources(dir: &Path) -> Vec<Resource> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Resource directory not readable, no resources loaded");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            !is_ignored(&name.to_string_lossy())
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut resources = Vec::with_capacity(paths.len());
    for path in paths {
        debug!(file = %path.display(), "Loading resource");
        match ResourceDefinition::load(&path).and_then(Resource::from_definition) {
            Ok(resource) => resources.push(resource),
            Err(e) => error!(file = %path.display(), error = %e, "Could not load resource"),
        }
    }
    resources
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const SHORT: Duration = Duration::from_millis(50);
    const LONG: Duration = Duration::from_secs(5);

    fn build_manager() -> Arc<ResourceManager> {
        let resources = [
            ResourceDefinition::new("Alpha", 1).with_keywords(["build"]),
            ResourceDefinition::new("Beta", 1).with_keywords(["build", "Test"]),
            ResourceDefinition::new("Gamma", 2).with_keywords(["test"]),
        ];
        Arc::new(ResourceManager::new(
            resources.into_iter().map(|d| Resource::from_definition(d).unwrap()),
        ))
    }

    #[test]
    fn test_keyword_index() {
        let manager = build_manager();
        assert_eq!(manager.names_for_keyword("BUILD"), ["Alpha", "Beta"]);
        assert_eq!(manager.names_for_keyword("test"), ["Beta", "Gamma"]);
        assert_eq!(manager.names_for_keyword("alpha"), ["Alpha"]);
        assert!(manager.names_for_keyword("missing").is_empty());
    }

    #[test]
    fn test_duplicate_names_keep_the_first() {
        let manager = ResourceManager::new([
            Resource::new("Same", 1).unwrap(),
            Resource::new("Same", 5).unwrap(),
        ]);
        assert_eq!(manager.resources().count(), 1);
        assert_eq!(manager.resource("Same").unwrap().parallel_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_keyword_returns_none_immediately() {
        let manager = build_manager();
        let result = timeout(SHORT, manager.acquire("u", "nope", false)).await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_acquire_skips_exhausted_resource() {
        let manager = build_manager();
        assert_eq!(manager.acquire("u", "build", false).await.as_deref(), Some("Alpha"));
        assert_eq!(manager.acquire("u", "Build", false).await.as_deref(), Some("Beta"));
        assert_eq!(manager.resource("Alpha").unwrap().current_count(), 0);
        assert_eq!(manager.resource("Beta").unwrap().current_count(), 0);
    }

    #[tokio::test]
    async fn test_acquire_by_resource_name() {
        let manager = build_manager();
        assert_eq!(manager.acquire("u", "gamma", true).await.as_deref(), Some("Gamma"));
        assert!(manager.resource("Gamma").unwrap().is_exclusive());
    }

    #[tokio::test]
    async fn test_blocked_acquire_takes_whichever_resource_frees_up() {
        let manager = build_manager();
        manager.acquire("a", "build", false).await.unwrap();
        manager.acquire("b", "build", false).await.unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire("c", "build", false).await })
        };
        tokio::time::sleep(SHORT).await;
        assert!(!waiter.is_finished());

        manager.release("Beta", "b", false).unwrap();
        let granted = timeout(LONG, waiter).await.unwrap().unwrap();
        assert_eq!(granted.as_deref(), Some("Beta"));
        assert_eq!(manager.resource("Beta").unwrap().users(), ["c"]);
    }

    #[tokio::test]
    async fn test_shutdown_releases_blocked_scanners() {
        let manager = build_manager();
        manager.acquire("a", "alpha", false).await.unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire("b", "alpha", false).await })
        };
        tokio::time::sleep(SHORT).await;

        manager.shutdown();
        assert_eq!(timeout(LONG, waiter).await.unwrap().unwrap(), None);
        assert!(!manager.is_running());
        assert!(manager.resources().all(|r| !r.is_running()));
        assert_eq!(manager.acquire("c", "gamma", false).await, None);
    }

    #[test]
    fn test_release_unknown_resource() {
        let manager = build_manager();
        let err = manager.release("Nope", "u", false).unwrap_err();
        assert_eq!(err, ResourceError::NotFound("Nope".to_string()));
    }

    #[tokio::test]
    async fn test_release_propagates_state_errors() {
        let manager = build_manager();
        manager.acquire("a", "gamma", false).await.unwrap();

        let err = manager.release("Gamma", "b", false).unwrap_err();
        assert!(err.is_state_error());
        let err = manager.release("Gamma", "a", true).unwrap_err();
        assert!(err.is_state_error());
        assert_eq!(manager.resource("Gamma").unwrap().current_count(), 1);
    }

    #[tokio::test]
    async fn test_resize_through_manager_wakes_scanners() {
        let manager = build_manager();
        manager.acquire("a", "alpha", false).await.unwrap();

        let waiter = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.acquire("b", "alpha", false).await })
        };
        tokio::time::sleep(SHORT).await;

        manager.set_parallel_count("Alpha", 2).unwrap();
        let granted = timeout(LONG, waiter).await.unwrap().unwrap();
        assert_eq!(granted.as_deref(), Some("Alpha"));
        assert!(manager.set_parallel_count("Nope", 2).is_err());
    }

    #[tokio::test]
    async fn test_status_list_and_details() {
        let manager = build_manager();
        manager.acquire("a", "test", false).await.unwrap();

        let list = manager.status_list();
        let names: Vec<_> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta", "Gamma"]);
        assert_eq!(list[1].users, ["a"]);
        assert!(list.iter().all(|s| s.parameters.is_none()));

        let details = manager.resource_details("Beta").unwrap();
        assert_eq!(details.free, 0);
        assert_eq!(details.keywords, ["beta", "build", "test"]);
        assert!(details.parameters.is_some());
        assert!(manager.resource_details("Nope").is_err());
    }

    #[test]
    fn test_ignored_file_names() {
        assert!(is_ignored(".test2.resource"));
        assert!(is_ignored("test2.resource.bkp"));
        assert!(!is_ignored("test1.resource"));
    }
}
