//! store::lock
//!
//! Exclusive lock on one replica directory.
//!
//! # Architecture
//!
//! Every mutation of a [`FileReplica`](super::FileReplica) holds this lock,
//! so two `mdc` processes never interleave writes to the same replica.
//! The lock lives at `<root>/.mdc.lock`.
//!
//! # Invariants
//!
//! - Lock acquisition is non-blocking (fails fast if locked)
//! - Lock is released on drop
//! - The replica root is never created here; a missing root means the
//!   replica is unreachable, which the caller reports
//!
//! # Example
//!
//! ```no_run
//! use multidc::store::lock::ReplicaLock;
//! use std::path::Path;
//!
//! let _guard = ReplicaLock::acquire(Path::new("/var/lib/mdc/dc1")).unwrap();
//! // writes to the replica go here; the lock is released when the guard drops
//! ```

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Name of the lock file inside a replica root.
pub const LOCK_FILE: &str = ".mdc.lock";

/// Errors from locking a replica.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process holds the replica lock.
    #[error("replica is locked by another process")]
    AlreadyLocked,

    /// The lock file could not be opened.
    #[error("cannot open lock file '{path}'")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The OS refused the lock for a reason other than contention.
    #[error("cannot lock replica")]
    Os(#[source] io::Error),
}

/// Guard holding the exclusive lock on a replica root until dropped.
#[derive(Debug)]
pub struct ReplicaLock {
    file: File,
}

impl ReplicaLock {
    /// Take the lock for the replica rooted at `root` without waiting.
    pub fn acquire(root: &Path) -> Result<Self, LockError> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open { path, source })?;

        file.try_lock_exclusive().map_err(|e| match e.kind() {
            io::ErrorKind::WouldBlock => LockError::AlreadyLocked,
            _ => LockError::Os(e),
        })?;

        Ok(Self { file })
    }
}

impl Drop for ReplicaLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
