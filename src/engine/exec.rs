//! engine::exec
//!
//! The multi-datacenter executor.
//!
//! # Architecture
//!
//! Every administrative mutation flows through [`MultiDatacenterExecutor`].
//! It resolves the replicas of the command's repository kind and applies
//! the command to each of them, one at a time, in locator order.
//!
//! # Executor Contract
//!
//! For one run with policy `(compensate, stop_on_unavailable)`:
//! 1. If compensating, snapshot the local replica. Failure aborts the run
//!    before any replica is touched.
//! 2. Resolve the ordered replica set.
//! 3. For each replica: append it to the executed sequence, then apply.
//!    - Availability failure: warn, compensate the executed sequence if
//!      compensating, then stop if `stop_on_unavailable`, else continue.
//!    - Any other failure: warn, compensate if compensating, always stop.
//! 4. Reaching the end of the replica set is success.
//!
//! # Policies
//!
//! | caller                 | compensate        | stop on unavailable |
//! |------------------------|-------------------|---------------------|
//! | admin                  | no                | no                  |
//! | non-admin / system     | `rollback_enabled`| yes                 |
//!
//! Non-availability failures stop the run under every policy.
//!
//! # Invariants
//!
//! - No replica is mutated without a prior successful snapshot when
//!   compensation is requested
//! - Replicas are visited sequentially; compensation unwinds a well-defined
//!   prefix of attempted work
//! - A run surfaces at most one error; compensation outcomes never change it
//! - The executor holds no run state, so independent runs may proceed on
//!   different threads
//!
//! # Example
//!
//! ```
//! use multidc::core::auth::CliUser;
//! use multidc::engine::exec::MultiDatacenterExecutor;
//! use multidc::engine::mock::{registry, Outcome, ScriptedCommand};
//!
//! let executor = MultiDatacenterExecutor::new(registry("topics", "a", &["a", "b", "c"]), true);
//! let command = ScriptedCommand::new("topics").on_apply("b", Outcome::Unavailable);
//!
//! // Administrators push through unreachable datacenters.
//! executor.execute_by_user(&command, &CliUser::new("root", true)).unwrap();
//! assert_eq!(command.applied(), ["a", "b", "c"]);
//! assert!(command.compensated().is_empty());
//! ```

use thiserror::Error;
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use super::command::{ApplyError, RepositoryCommand, SnapshotError};
use super::compensation::compensate_all;
use super::replica::{LocateError, ReplicaHandle, RepositoryLocator};
use crate::core::auth::RequestUser;
use crate::core::types::DatacenterName;

/// Fatal failure of a coordinated run.
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// The pre-mutation snapshot of the local replica failed.
    #[error("Snapshot for command '{command}' failed on DC '{datacenter}'.")]
    SnapshotFailed {
        /// Diagnostic label of the command.
        command: String,
        /// The local datacenter.
        datacenter: DatacenterName,
        /// Underlying snapshot failure.
        #[source]
        source: SnapshotError,
    },

    /// Applying the command to a replica failed and the run stopped.
    #[error("Execution of command '{command}' failed on DC '{datacenter}'.")]
    Execution {
        /// Diagnostic label of the command.
        command: String,
        /// Datacenter whose replica failed.
        datacenter: DatacenterName,
        /// Underlying apply failure.
        #[source]
        source: ApplyError,
    },

    /// The replica set could not be resolved.
    #[error(transparent)]
    Locate(#[from] LocateError),
}

impl ExecuteError {
    /// Label of the failed command, if the run got far enough to have one.
    pub fn command(&self) -> Option<&str> {
        match self {
            ExecuteError::SnapshotFailed { command, .. }
            | ExecuteError::Execution { command, .. } => Some(command),
            ExecuteError::Locate(_) => None,
        }
    }

    /// Datacenter the failure is attributed to.
    pub fn datacenter(&self) -> Option<&DatacenterName> {
        match self {
            ExecuteError::SnapshotFailed { datacenter, .. }
            | ExecuteError::Execution { datacenter, .. } => Some(datacenter),
            ExecuteError::Locate(_) => None,
        }
    }

    /// Whether the run stopped because a replica could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ExecuteError::Execution {
                source: ApplyError::Unavailable(_),
                ..
            }
        )
    }

    /// Wrap an apply failure with the command and datacenter.
    ///
    /// A cause that already is an `ExecuteError` (a nested coordinated run)
    /// passes through unchanged.
    fn wrap(command: String, datacenter: DatacenterName, source: ApplyError) -> Self {
        match source {
            ApplyError::Other(cause) => match cause.downcast::<ExecuteError>() {
                Ok(inner) => *inner,
                Err(cause) => ExecuteError::Execution {
                    command,
                    datacenter,
                    source: ApplyError::Other(cause),
                },
            },
            source => ExecuteError::Execution {
                command,
                datacenter,
                source,
            },
        }
    }
}

/// How a run reacts to failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Snapshot before mutation and compensate on failure.
    pub compensate: bool,
    /// Stop at the first availability failure instead of continuing.
    pub stop_on_unavailable: bool,
}

impl ExecutionPolicy {
    /// Administrator policy: no compensation, continue past unreachable
    /// replicas.
    pub const fn best_effort() -> Self {
        Self {
            compensate: false,
            stop_on_unavailable: false,
        }
    }

    /// Stop on the first failure, compensating if `compensate`.
    pub const fn fail_fast(compensate: bool) -> Self {
        Self {
            compensate,
            stop_on_unavailable: true,
        }
    }
}

/// Applies commands to every replica of their repository kind.
#[derive(Debug, Clone)]
pub struct MultiDatacenterExecutor<L> {
    locator: L,
    rollback_enabled: bool,
}

impl<L> MultiDatacenterExecutor<L> {
    /// Create an executor.
    ///
    /// `rollback_enabled` is the global compensation setting used for
    /// non-admin and system runs. It is fixed for the executor's lifetime.
    pub fn new(locator: L, rollback_enabled: bool) -> Self {
        Self {
            locator,
            rollback_enabled,
        }
    }

    /// The locator replicas are resolved from.
    pub fn locator(&self) -> &L {
        &self.locator
    }

    /// The global compensation setting.
    pub fn rollback_enabled(&self) -> bool {
        self.rollback_enabled
    }

    /// Policy applied to runs requested by `user`.
    pub fn policy_for(&self, user: &dyn RequestUser) -> ExecutionPolicy {
        if user.is_admin() {
            ExecutionPolicy::best_effort()
        } else {
            ExecutionPolicy::fail_fast(self.rollback_enabled)
        }
    }

    /// Run a command on behalf of a user.
    ///
    /// Administrators get [`ExecutionPolicy::best_effort`]; everyone else
    /// gets the same policy as [`execute`](Self::execute).
    pub fn execute_by_user<C, U>(&self, command: &C, user: &U) -> Result<(), ExecuteError>
    where
        C: RepositoryCommand,
        L: RepositoryLocator<C::Repository>,
        U: RequestUser,
    {
        let policy = self.policy_for(user);
        debug!(user = user.username(), admin = user.is_admin(), ?policy, "resolved policy");
        self.execute_with_policy(command, policy)
    }

    /// Run a system-initiated command.
    ///
    /// Always stops on the first failure, compensating per the global
    /// setting.
    pub fn execute<C>(&self, command: &C) -> Result<(), ExecuteError>
    where
        C: RepositoryCommand,
        L: RepositoryLocator<C::Repository>,
    {
        self.execute_with_policy(command, ExecutionPolicy::fail_fast(self.rollback_enabled))
    }

    /// Run a command under an explicit policy.
    pub fn execute_with_policy<C>(
        &self,
        command: &C,
        policy: ExecutionPolicy,
    ) -> Result<(), ExecuteError>
    where
        C: RepositoryCommand,
        L: RepositoryLocator<C::Repository>,
    {
        let span = info_span!(
            "coordinated_run",
            run_id = %Uuid::new_v4(),
            command = %command,
            kind = %command.repository_kind(),
        );
        let _guard = span.enter();

        if policy.compensate {
            self.snapshot(command)?;
        }

        let replicas = self.locator.replicas_for(command.repository_kind())?;
        let mut executed: Vec<&ReplicaHandle<C::Repository>> = Vec::with_capacity(replicas.len());

        for handle in replicas {
            executed.push(handle);
            debug!(datacenter = %handle.datacenter(), "applying");

            let Err(err) = command.apply(handle) else {
                continue;
            };

            match &err {
                ApplyError::Unavailable(_) => warn!(
                    datacenter = %handle.datacenter(),
                    error = %err,
                    "apply failed: repository not available"
                ),
                ApplyError::Other(_) => warn!(
                    datacenter = %handle.datacenter(),
                    error = %err,
                    "apply failed"
                ),
            }

            if policy.compensate {
                let report = compensate_all(command, &executed);
                if report.is_complete() {
                    info!(datacenter = %handle.datacenter(), "{report}");
                } else {
                    warn!(datacenter = %handle.datacenter(), "{report}");
                }
            }

            if err.is_unavailable() && !policy.stop_on_unavailable {
                continue;
            }

            return Err(ExecuteError::wrap(
                command.to_string(),
                handle.datacenter().clone(),
                err,
            ));
        }

        info!(replicas = replicas.len(), "command applied");
        Ok(())
    }

    /// Snapshot the local replica of the command's kind.
    fn snapshot<C>(&self, command: &C) -> Result<(), ExecuteError>
    where
        C: RepositoryCommand,
        L: RepositoryLocator<C::Repository>,
    {
        let local = self.locator.local_replica_for(command.repository_kind())?;
        debug!(datacenter = %local.datacenter(), "taking snapshot");

        command
            .snapshot(local)
            .map_err(|source| ExecuteError::SnapshotFailed {
                command: command.to_string(),
                datacenter: local.datacenter().clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::CliUser;
    use crate::engine::mock::{registry, Call, Outcome, ScriptedCommand};
    use crate::engine::replica::RepositoryRegistry;

    fn executor(rollback_enabled: bool) -> MultiDatacenterExecutor<RepositoryRegistry<()>> {
        MultiDatacenterExecutor::new(registry("topics", "a", &["a", "b", "c"]), rollback_enabled)
    }

    fn calls(items: &[(&str, &str)]) -> Vec<Call> {
        items
            .iter()
            .map(|(op, dc)| match *op {
                "snapshot" => Call::Snapshot(dc.to_string()),
                "apply" => Call::Apply(dc.to_string()),
                "compensate" => Call::Compensate(dc.to_string()),
                other => panic!("unknown op {other}"),
            })
            .collect()
    }

    mod policy {
        use super::*;

        #[test]
        fn admin_gets_best_effort() {
            let exec = executor(true);
            let policy = exec.policy_for(&CliUser::new("root", true));
            assert_eq!(policy, ExecutionPolicy::best_effort());
            assert!(!policy.compensate);
            assert!(!policy.stop_on_unavailable);
        }

        #[test]
        fn non_admin_follows_global_setting() {
            let user = CliUser::new("bob", false);
            assert_eq!(executor(true).policy_for(&user), ExecutionPolicy::fail_fast(true));
            assert_eq!(executor(false).policy_for(&user), ExecutionPolicy::fail_fast(false));
        }
    }

    mod protocol {
        use super::*;

        #[test]
        fn healthy_run_applies_everywhere_in_order() {
            let command = ScriptedCommand::new("topics");
            executor(true).execute(&command).unwrap();

            assert_eq!(
                command.calls(),
                calls(&[
                    ("snapshot", "a"),
                    ("apply", "a"),
                    ("apply", "b"),
                    ("apply", "c"),
                ])
            );
        }

        #[test]
        fn no_snapshot_without_compensation() {
            let command = ScriptedCommand::new("topics");
            executor(false).execute(&command).unwrap();
            assert!(command.snapshotted().is_empty());
            assert_eq!(command.applied(), ["a", "b", "c"]);
        }

        #[test]
        fn unavailable_with_stop_compensates_executed_prefix() {
            let command = ScriptedCommand::new("topics").on_apply("b", Outcome::Unavailable);
            let err = executor(true).execute(&command).unwrap_err();

            assert_eq!(
                command.calls(),
                calls(&[
                    ("snapshot", "a"),
                    ("apply", "a"),
                    ("apply", "b"),
                    ("compensate", "a"),
                    ("compensate", "b"),
                ])
            );
            assert!(err.is_unavailable());
            assert_eq!(err.datacenter().unwrap().as_str(), "b");
            assert_eq!(err.command(), Some("Scripted(topics)"));
        }

        #[test]
        fn admin_continues_past_unavailable() {
            let command = ScriptedCommand::new("topics").on_apply("b", Outcome::Unavailable);
            executor(true)
                .execute_by_user(&command, &CliUser::new("root", true))
                .unwrap();

            assert_eq!(command.applied(), ["a", "b", "c"]);
            assert!(command.compensated().is_empty());
            assert!(command.snapshotted().is_empty());
        }

        #[test]
        fn admin_stops_on_other_failure() {
            let command = ScriptedCommand::new("topics").on_apply("b", Outcome::Fail);
            let err = executor(true)
                .execute_by_user(&command, &CliUser::new("root", true))
                .unwrap_err();

            assert_eq!(command.applied(), ["a", "b"]);
            assert!(command.compensated().is_empty());
            assert!(!err.is_unavailable());
            assert_eq!(err.datacenter().unwrap().as_str(), "b");
        }

        #[test]
        fn every_unavailable_replica_is_skipped_under_best_effort() {
            let command = ScriptedCommand::new("topics")
                .on_apply("a", Outcome::Unavailable)
                .on_apply("c", Outcome::Unavailable);
            executor(false)
                .execute_with_policy(&command, ExecutionPolicy::best_effort())
                .unwrap();
            assert_eq!(command.applied(), ["a", "b", "c"]);
        }

        #[test]
        fn compensating_without_stop_continues_after_compensation() {
            let command = ScriptedCommand::new("topics").on_apply("b", Outcome::Unavailable);
            let policy = ExecutionPolicy {
                compensate: true,
                stop_on_unavailable: false,
            };
            executor(false).execute_with_policy(&command, policy).unwrap();

            assert_eq!(
                command.calls(),
                calls(&[
                    ("snapshot", "a"),
                    ("apply", "a"),
                    ("apply", "b"),
                    ("compensate", "a"),
                    ("compensate", "b"),
                    ("apply", "c"),
                ])
            );
        }

        #[test]
        fn snapshot_failure_prevents_any_apply() {
            let command = ScriptedCommand::new("topics").failing_snapshot();
            let err = executor(true).execute(&command).unwrap_err();

            assert!(command.applied().is_empty());
            assert!(command.compensated().is_empty());
            assert!(matches!(err, ExecuteError::SnapshotFailed { .. }));
            assert_eq!(err.datacenter().unwrap().as_str(), "a");
        }

        #[test]
        fn compensation_failure_does_not_change_outcome() {
            let command = ScriptedCommand::new("topics")
                .on_apply("c", Outcome::Fail)
                .failing_compensation("a");
            let err = executor(true).execute(&command).unwrap_err();

            assert_eq!(command.compensated(), ["a", "b", "c"]);
            assert_eq!(err.datacenter().unwrap().as_str(), "c");
            assert!(matches!(
                err,
                ExecuteError::Execution {
                    source: ApplyError::Other(_),
                    ..
                }
            ));
        }

        #[test]
        fn unknown_kind_is_locate_error() {
            let command = ScriptedCommand::new("groups");
            let err = executor(false).execute(&command).unwrap_err();
            assert!(matches!(err, ExecuteError::Locate(LocateError::UnknownKind(_))));
            assert!(err.command().is_none());
            assert!(command.calls().is_empty());
        }
    }

    mod execute_error {
        use super::*;

        #[test]
        fn nested_execute_error_is_not_wrapped_twice() {
            let inner = ExecuteError::Execution {
                command: "Inner".into(),
                datacenter: DatacenterName::new("x").unwrap(),
                source: ApplyError::other("boom"),
            };
            let wrapped = ExecuteError::wrap(
                "Outer".into(),
                DatacenterName::new("y").unwrap(),
                ApplyError::other(inner),
            );

            assert_eq!(wrapped.command(), Some("Inner"));
            assert_eq!(wrapped.datacenter().unwrap().as_str(), "x");
        }

        #[test]
        fn plain_cause_is_wrapped() {
            let wrapped = ExecuteError::wrap(
                "Outer".into(),
                DatacenterName::new("y").unwrap(),
                ApplyError::other("boom"),
            );
            assert_eq!(
                wrapped.to_string(),
                "Execution of command 'Outer' failed on DC 'y'."
            );
            assert_eq!(std::error::Error::source(&wrapped).unwrap().to_string(), "boom");
        }
    }
}
