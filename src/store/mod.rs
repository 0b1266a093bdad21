//! store
//!
//! File-backed replicas, one directory per datacenter.
//!
//! # Layout
//!
//! ```text
//! <root>/.mdc.lock              exclusive lock held during mutations
//! <root>/<kind>/<key>.json      one StoredEntry per key
//! ```
//!
//! # Availability
//!
//! A replica whose root directory does not exist, or whose lock is held by
//! another process, is reported as unavailable. The executor treats that as
//! an availability failure and applies its policy. Every other I/O or decode
//! problem is an ordinary failure.
//!
//! # Example
//!
//! ```no_run
//! use multidc::core::types::{EntryKey, RepositoryKind};
//! use multidc::store::FileReplica;
//!
//! let replica = FileReplica::new("/var/lib/mdc/dc1");
//! let topics = RepositoryKind::new("topics").unwrap();
//! let key = EntryKey::new("orders").unwrap();
//!
//! replica.put(&topics, &key, "{\"retention\": 7}").unwrap();
//! assert!(replica.get(&topics, &key).unwrap().is_some());
//! ```

pub mod commands;
pub mod lock;

pub use commands::{PutEntry, RemoveEntry};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use self::lock::{LockError, ReplicaLock};
use crate::core::types::{ContentDigest, EntryKey, RepositoryKind, UtcTimestamp};
use crate::engine::command::{
    ApplyError, CompensationError, RepositoryUnavailable, SnapshotError,
};

/// Errors from replica storage.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The replica cannot be reached.
    #[error("replica at '{root}' is unavailable: {reason}")]
    Unavailable { root: PathBuf, reason: String },

    /// The entry does not exist.
    #[error("entry '{kind}/{key}' not found")]
    NotFound { kind: RepositoryKind, key: EntryKey },

    /// Filesystem failure.
    #[error("i/o error at '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An entry file could not be decoded or encoded.
    #[error("invalid entry file '{path}': {source}")]
    Codec {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The replica lock could not be taken.
    #[error(transparent)]
    Lock(LockError),
}

impl StoreError {
    /// Whether the error means the replica could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable { .. })
    }
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        if let StoreError::Unavailable { reason, .. } = &err {
            let reason = reason.clone();
            return RepositoryUnavailable::with_source(reason, err).into();
        }
        ApplyError::other(err)
    }
}

impl From<StoreError> for SnapshotError {
    fn from(err: StoreError) -> Self {
        SnapshotError::with_source("cannot read local replica", err)
    }
}

impl From<StoreError> for CompensationError {
    fn from(err: StoreError) -> Self {
        CompensationError::with_source("cannot restore replica", err)
    }
}

/// One stored key/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    /// Entry key
    pub key: EntryKey,
    /// Entry value, stored verbatim
    pub value: String,
    /// When this version was written
    pub updated_at: UtcTimestamp,
}

/// A datacenter-local replica rooted at a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReplica {
    root: PathBuf,
}

impl FileReplica {
    /// Replica rooted at `root`. The directory is not created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the replica.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the replica root exists.
    pub fn is_reachable(&self) -> bool {
        self.root.is_dir()
    }

    /// Read one entry.
    pub fn get(
        &self,
        kind: &RepositoryKind,
        key: &EntryKey,
    ) -> Result<Option<StoredEntry>, StoreError> {
        self.ensure_reachable()?;
        self.read_entry(&self.entry_path(kind, key))
    }

    /// Insert or replace an entry.
    pub fn put(
        &self,
        kind: &RepositoryKind,
        key: &EntryKey,
        value: &str,
    ) -> Result<StoredEntry, StoreError> {
        let entry = StoredEntry {
            key: key.clone(),
            value: value.to_string(),
            updated_at: UtcTimestamp::now(),
        };
        self.restore(kind, &entry)?;
        Ok(entry)
    }

    /// Write an entry exactly as given, keeping its timestamp.
    pub fn restore(&self, kind: &RepositoryKind, entry: &StoredEntry) -> Result<(), StoreError> {
        self.ensure_reachable()?;
        let _lock = self.lock()?;

        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            source: e,
        })?;
        self.write_atomic(&self.entry_path(kind, &entry.key), entry)
    }

    /// Remove an existing entry, returning it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the entry does not exist.
    pub fn remove(&self, kind: &RepositoryKind, key: &EntryKey) -> Result<StoredEntry, StoreError> {
        self.ensure_reachable()?;
        let _lock = self.lock()?;

        let path = self.entry_path(kind, key);
        let entry = self
            .read_entry(&path)?
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.clone(),
                key: key.clone(),
            })?;
        fs::remove_file(&path).map_err(|e| StoreError::Io { path, source: e })?;
        Ok(entry)
    }

    /// Remove an entry if present. Returns whether anything was removed.
    pub fn discard(&self, kind: &RepositoryKind, key: &EntryKey) -> Result<bool, StoreError> {
        match self.remove(kind, key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// All entries of a kind, sorted by key.
    pub fn list(&self, kind: &RepositoryKind) -> Result<Vec<StoredEntry>, StoreError> {
        self.ensure_reachable()?;

        let dir = self.kind_dir(kind);
        if !dir.exists() {
            return Ok(vec![]);
        }

        let read_dir = fs::read_dir(&dir).map_err(|e| StoreError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for item in read_dir {
            let item = item.map_err(|e| StoreError::Io {
                path: dir.clone(),
                source: e,
            })?;
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(entry) = self.read_entry(&path)? {
                entries.push(entry);
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    /// Digest over all key/value pairs of a kind.
    pub fn digest(&self, kind: &RepositoryKind) -> Result<ContentDigest, StoreError> {
        let pairs: Vec<_> = self
            .list(kind)?
            .into_iter()
            .map(|e| (e.key, e.value))
            .collect();
        Ok(ContentDigest::compute(&pairs))
    }

    fn ensure_reachable(&self) -> Result<(), StoreError> {
        if self.is_reachable() {
            Ok(())
        } else {
            Err(StoreError::Unavailable {
                root: self.root.clone(),
                reason: "replica root does not exist".into(),
            })
        }
    }

    fn lock(&self) -> Result<ReplicaLock, StoreError> {
        ReplicaLock::acquire(&self.root).map_err(|e| match e {
            LockError::AlreadyLocked => StoreError::Unavailable {
                root: self.root.clone(),
                reason: e.to_string(),
            },
            other => StoreError::Lock(other),
        })
    }

    fn kind_dir(&self, kind: &RepositoryKind) -> PathBuf {
        self.root.join(kind.as_str())
    }

    fn entry_path(&self, kind: &RepositoryKind, key: &EntryKey) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.json", key))
    }

    fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>, StoreError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Codec {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Write to a temp file in the same directory, then rename.
    fn write_atomic(&self, path: &Path, entry: &StoredEntry) -> Result<(), StoreError> {
        let contents = serde_json::to_vec_pretty(entry).map_err(|e| StoreError::Codec {
            path: path.to_path_buf(),
            source: e,
        })?;

        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |e: std::io::Error| StoreError::Io { path, source: e }
        };

        let temp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&temp_path).map_err(io_err(&temp_path))?;
        file.write_all(&contents).map_err(io_err(&temp_path))?;
        file.sync_all().map_err(io_err(&temp_path))?;
        fs::rename(&temp_path, path).map_err(io_err(path))?;

        Ok(())
    }
}
