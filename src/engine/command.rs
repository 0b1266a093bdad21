//! engine::command
//!
//! The contract a mutation implements to be coordinated across datacenters.
//!
//! # Architecture
//!
//! A [`RepositoryCommand`] is built per administrative request, handed to
//! the executor exactly once, and then dropped. It exposes three
//! capabilities against one replica handle:
//!
//! 1. `snapshot` - capture the local replica's state before mutation
//! 2. `apply` - perform the mutation on one replica
//! 3. `compensate` - best-effort inverse of `apply`
//!
//! The `Display` impl is the command's diagnostic label; it appears in
//! every error and log line the executor emits for the run.
//!
//! # Invariants
//!
//! - `apply` distinguishes "replica could not be reached"
//!   ([`ApplyError::Unavailable`]) from every other failure
//!   ([`ApplyError::Other`]). Only the former is subject to policy.
//! - `compensate` must be idempotent and safe on a replica where nothing
//!   landed: the executor compensates every handle it *attempted*,
//!   including the one whose `apply` just failed.
//!
//! # Example
//!
//! ```
//! use std::fmt;
//! use multidc::core::types::RepositoryKind;
//! use multidc::engine::command::{ApplyError, CompensationError, RepositoryCommand, SnapshotError};
//! use multidc::engine::replica::ReplicaHandle;
//!
//! struct Touch(RepositoryKind);
//!
//! impl fmt::Display for Touch {
//!     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
//!         write!(f, "Touch({})", self.0)
//!     }
//! }
//!
//! impl RepositoryCommand for Touch {
//!     type Repository = ();
//!
//!     fn repository_kind(&self) -> &RepositoryKind {
//!         &self.0
//!     }
//!
//!     fn snapshot(&self, _: &ReplicaHandle<()>) -> Result<(), SnapshotError> {
//!         Ok(())
//!     }
//!
//!     fn apply(&self, _: &ReplicaHandle<()>) -> Result<(), ApplyError> {
//!         Ok(())
//!     }
//!
//!     fn compensate(&self, _: &ReplicaHandle<()>) -> Result<(), CompensationError> {
//!         Ok(())
//!     }
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use super::replica::ReplicaHandle;
use crate::core::types::RepositoryKind;

/// Boxed cause carried by command failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// The replica could not be reached.
#[derive(Debug, Error)]
#[error("repository not available: {reason}")]
pub struct RepositoryUnavailable {
    reason: String,
    #[source]
    source: Option<BoxError>,
}

impl RepositoryUnavailable {
    /// Unavailability with a human-readable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            source: None,
        }
    }

    /// Unavailability caused by a lower-level error.
    pub fn with_source(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }

    /// Why the replica is unavailable.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Failure of `apply` on one replica.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The replica could not be reached.
    #[error(transparent)]
    Unavailable(#[from] RepositoryUnavailable),

    /// Anything else.
    #[error(transparent)]
    Other(BoxError),
}

impl ApplyError {
    /// Wrap an arbitrary error as a non-availability failure.
    pub fn other(err: impl Into<BoxError>) -> Self {
        ApplyError::Other(err.into())
    }

    /// Whether this failure is subject to the availability policy.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApplyError::Unavailable(_))
    }
}

/// Failure of `snapshot`.
#[derive(Debug, Error)]
#[error("snapshot failed: {message}")]
pub struct SnapshotError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SnapshotError {
    /// Snapshot failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Snapshot failure caused by a lower-level error.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure of `compensate`. Logged by the executor, never surfaced.
#[derive(Debug, Error)]
#[error("compensation failed: {message}")]
pub struct CompensationError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CompensationError {
    /// Compensation failure with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Compensation failure caused by a lower-level error.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// A mutation that can be coordinated across per-datacenter replicas.
///
/// Implementors are stateless across runs. State captured by `snapshot`
/// lives only as long as the command value.
pub trait RepositoryCommand: fmt::Display {
    /// Replica type the command operates on.
    type Repository;

    /// Kind of repository the command targets.
    fn repository_kind(&self) -> &RepositoryKind;

    /// Capture the local replica's state before any mutation.
    fn snapshot(&self, replica: &ReplicaHandle<Self::Repository>) -> Result<(), SnapshotError>;

    /// Apply the mutation to one replica.
    fn apply(&self, replica: &ReplicaHandle<Self::Repository>) -> Result<(), ApplyError>;

    /// Undo the mutation on one replica.
    ///
    /// Must be safe to call when `apply` failed or never landed.
    fn compensate(
        &self,
        replica: &ReplicaHandle<Self::Repository>,
    ) -> Result<(), CompensationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display() {
        let err = ApplyError::from(RepositoryUnavailable::new("connection refused"));
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "repository not available: connection refused");
    }

    #[test]
    fn other_is_not_unavailable() {
        let err = ApplyError::other("constraint violated");
        assert!(!err.is_unavailable());
        assert_eq!(err.to_string(), "constraint violated");
    }

    #[test]
    fn unavailable_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such dir");
        let err = RepositoryUnavailable::with_source("replica root missing", io);
        assert_eq!(err.reason(), "replica root missing");
        assert!(err.source().is_some());
    }

    #[test]
    fn snapshot_error_display() {
        let err = SnapshotError::new("disk full");
        assert_eq!(err.to_string(), "snapshot failed: disk full");
        assert!(err.source().is_none());
    }

    #[test]
    fn compensation_error_keeps_source() {
        let err = CompensationError::with_source("restore", SnapshotError::new("inner"));
        assert_eq!(err.to_string(), "compensation failed: restore");
        assert_eq!(err.source().unwrap().to_string(), "snapshot failed: inner");
    }
}
