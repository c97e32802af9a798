//! # Core Errors
//!
//! This module defines the error types used throughout the locking engine.
//! Definition problems are reported while resources are loaded; everything else
//! is returned from the operations on [`Resource`](crate::Resource) and
//! [`ResourceManager`](crate::ResourceManager).

use std::path::PathBuf;

/// Errors raised while turning a resource definition into a [`Resource`](crate::Resource).
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Failed to read resource definition {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed resource definition: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("Missing field '{0}'")]
    MissingField(&'static str),
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Errors returned by acquire/release/resize operations.
///
/// `NotHeld` and `NotExclusive` signal a client releasing something it never
/// held. They are never ignored by the command layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResourceError {
    #[error("The resource does not exist: {0}")]
    NotFound(String),
    #[error("The resource {resource} is not held by user {user}")]
    NotHeld { resource: String, user: String },
    #[error("The resource {0} is not locked exclusively")]
    NotExclusive(String),
    #[error("Invalid parallel count {value} for resource {resource}: must be greater than zero")]
    InvalidParallelCount { resource: String, value: i64 },
}

impl ResourceError {
    /// True for errors caused by releasing a lease in the wrong state.
    pub fn is_state_error(&self) -> bool {
        matches!(self, Self::NotHeld { .. } | Self::NotExclusive(_))
    }
}
