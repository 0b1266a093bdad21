//! engine::replica
//!
//! Replica handles and the locator that resolves them.
//!
//! # Architecture
//!
//! The coordinator never discovers replicas itself. It asks a
//! [`RepositoryLocator`] for the ordered handle set of a command's
//! repository kind, and for the local handle used for snapshotting. The
//! locator owns the handles; a run only borrows them.
//!
//! # Invariants
//!
//! - At most one handle per datacenter per kind
//! - Resolution order is registration order and is stable across calls
//!
//! # Example
//!
//! ```
//! use multidc::core::types::{DatacenterName, RepositoryKind};
//! use multidc::engine::replica::{RepositoryLocator, RepositoryRegistry};
//!
//! let topics = RepositoryKind::new("topics").unwrap();
//! let dc1 = DatacenterName::new("dc1").unwrap();
//! let dc2 = DatacenterName::new("dc2").unwrap();
//!
//! let mut registry = RepositoryRegistry::new(dc1.clone());
//! registry.register(topics.clone(), dc1, "replica-1").unwrap();
//! registry.register(topics.clone(), dc2, "replica-2").unwrap();
//!
//! let replicas = registry.replicas_for(&topics).unwrap();
//! assert_eq!(replicas.len(), 2);
//! assert_eq!(*registry.local_replica_for(&topics).unwrap().repository(), "replica-1");
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::core::types::{DatacenterName, RepositoryKind};

/// Errors from replica resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    /// No replicas are registered for the kind.
    #[error("no replicas registered for repository kind '{0}'")]
    UnknownKind(RepositoryKind),

    /// The local datacenter holds no replica of the kind.
    #[error("no local replica of '{kind}' in DC '{datacenter}'")]
    NoLocalReplica {
        /// The requested kind.
        kind: RepositoryKind,
        /// The local datacenter.
        datacenter: DatacenterName,
    },

    /// A second handle for the same datacenter and kind was registered.
    #[error("DC '{datacenter}' already has a replica of '{kind}'")]
    DuplicateDatacenter {
        /// The kind being registered.
        kind: RepositoryKind,
        /// The datacenter registered twice.
        datacenter: DatacenterName,
    },
}

/// One datacenter-local replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaHandle<T> {
    datacenter: DatacenterName,
    repository: T,
}

impl<T> ReplicaHandle<T> {
    /// Bind a replica to its datacenter.
    pub fn new(datacenter: DatacenterName, repository: T) -> Self {
        Self {
            datacenter,
            repository,
        }
    }

    /// Datacenter owning this replica.
    pub fn datacenter(&self) -> &DatacenterName {
        &self.datacenter
    }

    /// The replica itself.
    pub fn repository(&self) -> &T {
        &self.repository
    }
}

/// Resolves replica handles for a repository kind.
pub trait RepositoryLocator<T> {
    /// All replicas of `kind`, in application order.
    fn replicas_for(&self, kind: &RepositoryKind) -> Result<&[ReplicaHandle<T>], LocateError>;

    /// The replica of `kind` in the local datacenter.
    fn local_replica_for(&self, kind: &RepositoryKind) -> Result<&ReplicaHandle<T>, LocateError>;
}

/// In-memory locator built by registering handles kind by kind.
#[derive(Debug, Clone)]
pub struct RepositoryRegistry<T> {
    local: DatacenterName,
    replicas: HashMap<RepositoryKind, Vec<ReplicaHandle<T>>>,
}

impl<T> RepositoryRegistry<T> {
    /// Create an empty registry whose local datacenter is `local`.
    pub fn new(local: DatacenterName) -> Self {
        Self {
            local,
            replicas: HashMap::new(),
        }
    }

    /// The local datacenter.
    pub fn local_datacenter(&self) -> &DatacenterName {
        &self.local
    }

    /// Append a replica of `kind` owned by `datacenter`.
    ///
    /// # Errors
    ///
    /// Returns `LocateError::DuplicateDatacenter` if `datacenter` already
    /// holds a replica of `kind`.
    pub fn register(
        &mut self,
        kind: RepositoryKind,
        datacenter: DatacenterName,
        repository: T,
    ) -> Result<(), LocateError> {
        let handles = self.replicas.entry(kind.clone()).or_default();
        if handles.iter().any(|h| h.datacenter == datacenter) {
            return Err(LocateError::DuplicateDatacenter { kind, datacenter });
        }
        handles.push(ReplicaHandle::new(datacenter, repository));
        Ok(())
    }

    /// Registered kinds, sorted by name.
    pub fn kinds(&self) -> Vec<&RepositoryKind> {
        let mut kinds: Vec<_> = self.replicas.keys().collect();
        kinds.sort();
        kinds
    }
}

impl<T> RepositoryLocator<T> for RepositoryRegistry<T> {
    fn replicas_for(&self, kind: &RepositoryKind) -> Result<&[ReplicaHandle<T>], LocateError> {
        self.replicas
            .get(kind)
            .map(Vec::as_slice)
            .ok_or_else(|| LocateError::UnknownKind(kind.clone()))
    }

    fn local_replica_for(&self, kind: &RepositoryKind) -> Result<&ReplicaHandle<T>, LocateError> {
        self.replicas_for(kind)?
            .iter()
            .find(|h| h.datacenter == self.local)
            .ok_or_else(|| LocateError::NoLocalReplica {
                kind: kind.clone(),
                datacenter: self.local.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(name: &str) -> RepositoryKind {
        RepositoryKind::new(name).unwrap()
    }

    fn dc(name: &str) -> DatacenterName {
        DatacenterName::new(name).unwrap()
    }

    #[test]
    fn resolves_in_registration_order() {
        let mut registry = RepositoryRegistry::new(dc("b"));
        registry.register(kind("topics"), dc("c"), 3).unwrap();
        registry.register(kind("topics"), dc("a"), 1).unwrap();
        registry.register(kind("topics"), dc("b"), 2).unwrap();

        let order: Vec<_> = registry
            .replicas_for(&kind("topics"))
            .unwrap()
            .iter()
            .map(|h| h.datacenter().as_str())
            .collect();
        assert_eq!(order, ["c", "a", "b"]);
    }

    #[test]
    fn local_replica_is_found_by_datacenter() {
        let mut registry = RepositoryRegistry::new(dc("b"));
        registry.register(kind("topics"), dc("a"), 1).unwrap();
        registry.register(kind("topics"), dc("b"), 2).unwrap();

        let local = registry.local_replica_for(&kind("topics")).unwrap();
        assert_eq!(local.datacenter().as_str(), "b");
        assert_eq!(*local.repository(), 2);
    }

    #[test]
    fn duplicate_datacenter_rejected() {
        let mut registry = RepositoryRegistry::new(dc("a"));
        registry.register(kind("topics"), dc("a"), 1).unwrap();
        let err = registry.register(kind("topics"), dc("a"), 2).unwrap_err();
        assert!(matches!(err, LocateError::DuplicateDatacenter { .. }));

        // Same datacenter under another kind is fine
        assert!(registry.register(kind("groups"), dc("a"), 3).is_ok());
    }

    #[test]
    fn unknown_kind() {
        let registry: RepositoryRegistry<u8> = RepositoryRegistry::new(dc("a"));
        assert_eq!(
            registry.replicas_for(&kind("topics")).unwrap_err(),
            LocateError::UnknownKind(kind("topics"))
        );
    }

    #[test]
    fn missing_local_replica() {
        let mut registry = RepositoryRegistry::new(dc("local"));
        registry.register(kind("topics"), dc("remote"), 1).unwrap();
        let err = registry.local_replica_for(&kind("topics")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no local replica of 'topics' in DC 'local'"
        );
    }

    #[test]
    fn kinds_are_sorted() {
        let mut registry = RepositoryRegistry::new(dc("a"));
        registry.register(kind("topics"), dc("a"), 1).unwrap();
        registry.register(kind("groups"), dc("a"), 1).unwrap();
        let kinds: Vec<_> = registry.kinds().iter().map(|k| k.as_str()).collect();
        assert_eq!(kinds, ["groups", "topics"]);
    }
}
