//! store::commands
//!
//! Concrete commands against [`FileReplica`]s.
//!
//! Both commands snapshot the local replica's current entry and compensate
//! by writing that snapshot back (or removing the key when the snapshot saw
//! nothing). Compensation is idempotent, so running it on a replica where
//! `apply` never landed is harmless.

use std::fmt;
use std::sync::OnceLock;

use super::{FileReplica, StoredEntry};
use crate::core::types::{EntryKey, RepositoryKind};
use crate::engine::command::{ApplyError, CompensationError, RepositoryCommand, SnapshotError};
use crate::engine::replica::ReplicaHandle;

/// Prior state of the entry on the local replica.
///
/// Unset until `snapshot` runs; `Some(None)` means the entry did not exist.
#[derive(Debug, Default)]
struct Snapshot(OnceLock<Option<StoredEntry>>);

impl Snapshot {
    fn take(
        &self,
        kind: &RepositoryKind,
        key: &EntryKey,
        replica: &ReplicaHandle<FileReplica>,
    ) -> Result<(), SnapshotError> {
        let prior = replica.repository().get(kind, key)?;
        self.0
            .set(prior)
            .map_err(|_| SnapshotError::new("snapshot already taken for this command"))
    }

    fn get(&self) -> Result<&Option<StoredEntry>, CompensationError> {
        self.0
            .get()
            .ok_or_else(|| CompensationError::new("no snapshot was taken"))
    }
}

/// Insert or replace one entry on every replica.
#[derive(Debug)]
pub struct PutEntry {
    kind: RepositoryKind,
    key: EntryKey,
    value: String,
    snapshot: Snapshot,
}

impl PutEntry {
    /// Set `kind/key` to `value`.
    pub fn new(kind: RepositoryKind, key: EntryKey, value: impl Into<String>) -> Self {
        Self {
            kind,
            key,
            value: value.into(),
            snapshot: Snapshot::default(),
        }
    }
}

impl fmt::Display for PutEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PutEntry({}/{})", self.kind, self.key)
    }
}

impl RepositoryCommand for PutEntry {
    type Repository = FileReplica;

    fn repository_kind(&self) -> &RepositoryKind {
        &self.kind
    }

    fn snapshot(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), SnapshotError> {
        self.snapshot.take(&self.kind, &self.key, replica)
    }

    fn apply(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), ApplyError> {
        replica
            .repository()
            .put(&self.kind, &self.key, &self.value)?;
        Ok(())
    }

    fn compensate(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), CompensationError> {
        match self.snapshot.get()? {
            Some(prior) => replica.repository().restore(&self.kind, prior)?,
            None => {
                replica.repository().discard(&self.kind, &self.key)?;
            }
        }
        Ok(())
    }
}

/// Remove one entry from every replica.
///
/// A replica that does not hold the entry fails `apply` with an ordinary
/// (non-availability) failure.
#[derive(Debug)]
pub struct RemoveEntry {
    kind: RepositoryKind,
    key: EntryKey,
    snapshot: Snapshot,
}

impl RemoveEntry {
    /// Remove `kind/key`.
    pub fn new(kind: RepositoryKind, key: EntryKey) -> Self {
        Self {
            kind,
            key,
            snapshot: Snapshot::default(),
        }
    }
}

impl fmt::Display for RemoveEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoveEntry({}/{})", self.kind, self.key)
    }
}

impl RepositoryCommand for RemoveEntry {
    type Repository = FileReplica;

    fn repository_kind(&self) -> &RepositoryKind {
        &self.kind
    }

    fn snapshot(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), SnapshotError> {
        self.snapshot.take(&self.kind, &self.key, replica)
    }

    fn apply(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), ApplyError> {
        replica.repository().remove(&self.kind, &self.key)?;
        Ok(())
    }

    fn compensate(&self, replica: &ReplicaHandle<FileReplica>) -> Result<(), CompensationError> {
        if let Some(prior) = self.snapshot.get()? {
            replica.repository().restore(&self.kind, prior)?;
        }
        Ok(())
    }
}
