//! engine::mock
//!
//! Scripted command for deterministic testing of the executor.
//!
//! # Design
//!
//! [`ScriptedCommand`] records every `snapshot`, `apply` and `compensate`
//! call in order and fails on the datacenters it was told to fail on.
//! Clones share state, so a test can keep one clone for inspection while
//! the executor borrows another.
//!
//! # Example
//!
//! ```
//! use multidc::core::types::DatacenterName;
//! use multidc::engine::exec::MultiDatacenterExecutor;
//! use multidc::engine::mock::{registry, Call, Outcome, ScriptedCommand};
//!
//! let command = ScriptedCommand::new("topics").on_apply("dc2", Outcome::Unavailable);
//! let executor = MultiDatacenterExecutor::new(registry("topics", "dc1", &["dc1", "dc2", "dc3"]), true);
//!
//! assert!(executor.execute(&command).is_err());
//! assert_eq!(command.applied(), ["dc1", "dc2"]);
//! assert_eq!(command.compensated(), ["dc1", "dc2"]);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use super::command::{
    ApplyError, CompensationError, RepositoryCommand, RepositoryUnavailable, SnapshotError,
};
use super::replica::{ReplicaHandle, RepositoryRegistry};
use crate::core::types::{DatacenterName, RepositoryKind};

/// What `apply` does on a given datacenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Succeed.
    Ok,
    /// Fail with an availability failure.
    Unavailable,
    /// Fail with any other failure.
    Fail,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// `snapshot` on the named datacenter.
    Snapshot(String),
    /// `apply` on the named datacenter.
    Apply(String),
    /// `compensate` on the named datacenter.
    Compensate(String),
}

/// Command whose behavior is scripted per datacenter.
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    kind: RepositoryKind,
    inner: Arc<Mutex<ScriptedInner>>,
}

#[derive(Debug, Default)]
struct ScriptedInner {
    apply: HashMap<String, Outcome>,
    failing_compensations: HashSet<String>,
    failing_snapshot: bool,
    calls: Vec<Call>,
}

impl ScriptedCommand {
    /// Command targeting `kind` that succeeds everywhere.
    ///
    /// # Panics
    ///
    /// Panics if `kind` is not a valid repository kind.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: RepositoryKind::new(kind).expect("valid repository kind"),
            inner: Arc::new(Mutex::new(ScriptedInner::default())),
        }
    }

    /// Script the outcome of `apply` on `datacenter`.
    pub fn on_apply(self, datacenter: &str, outcome: Outcome) -> Self {
        self.inner
            .lock()
            .unwrap()
            .apply
            .insert(datacenter.to_string(), outcome);
        self
    }

    /// Make `compensate` fail on `datacenter`.
    pub fn failing_compensation(self, datacenter: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .failing_compensations
            .insert(datacenter.to_string());
        self
    }

    /// Make `snapshot` fail.
    pub fn failing_snapshot(self) -> Self {
        self.inner.lock().unwrap().failing_snapshot = true;
        self
    }

    /// All recorded calls in order.
    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Datacenters `apply` was invoked on, in order.
    pub fn applied(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Apply(dc) => Some(dc),
                _ => None,
            })
            .collect()
    }

    /// Datacenters `compensate` was invoked on, in order.
    pub fn compensated(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Compensate(dc) => Some(dc),
                _ => None,
            })
            .collect()
    }

    /// Datacenters `snapshot` was invoked on.
    pub fn snapshotted(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Snapshot(dc) => Some(dc),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl fmt::Display for ScriptedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scripted({})", self.kind)
    }
}

impl RepositoryCommand for ScriptedCommand {
    type Repository = ();

    fn repository_kind(&self) -> &RepositoryKind {
        &self.kind
    }

    fn snapshot(&self, replica: &ReplicaHandle<()>) -> Result<(), SnapshotError> {
        let dc = replica.datacenter().to_string();
        self.record(Call::Snapshot(dc.clone()));
        if self.inner.lock().unwrap().failing_snapshot {
            return Err(SnapshotError::new(format!("scripted snapshot failure on {dc}")));
        }
        Ok(())
    }

    fn apply(&self, replica: &ReplicaHandle<()>) -> Result<(), ApplyError> {
        let dc = replica.datacenter().to_string();
        self.record(Call::Apply(dc.clone()));
        let outcome = self
            .inner
            .lock()
            .unwrap()
            .apply
            .get(&dc)
            .copied()
            .unwrap_or(Outcome::Ok);
        match outcome {
            Outcome::Ok => Ok(()),
            Outcome::Unavailable => Err(RepositoryUnavailable::new(format!("{dc} unreachable")).into()),
            Outcome::Fail => Err(ApplyError::other(format!("scripted failure on {dc}"))),
        }
    }

    fn compensate(&self, replica: &ReplicaHandle<()>) -> Result<(), CompensationError> {
        let dc = replica.datacenter().to_string();
        self.record(Call::Compensate(dc.clone()));
        if self.inner.lock().unwrap().failing_compensations.contains(&dc) {
            return Err(CompensationError::new(format!(
                "scripted compensation failure on {dc}"
            )));
        }
        Ok(())
    }
}

/// Registry with one `()` replica of `kind` per datacenter, in order.
///
/// # Panics
///
/// Panics on invalid names or duplicate datacenters.
pub fn registry(kind: &str, local: &str, datacenters: &[&str]) -> RepositoryRegistry<()> {
    let kind = RepositoryKind::new(kind).expect("valid repository kind");
    let mut registry =
        RepositoryRegistry::new(DatacenterName::new(local).expect("valid datacenter name"));
    for dc in datacenters {
        registry
            .register(
                kind.clone(),
                DatacenterName::new(*dc).expect("valid datacenter name"),
                (),
            )
            .expect("unique datacenter");
    }
    registry
}
