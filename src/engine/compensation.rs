//! engine::compensation
//!
//! Best-effort rollback of the replicas a run attempted to touch.
//!
//! # Order
//!
//! Handles are compensated in the order they were executed. The executed
//! sequence includes the handle whose `apply` triggered compensation, so a
//! command's `compensate` must tolerate replicas where nothing landed.
//!
//! # Failure handling
//!
//! Each handle is compensated independently. A failure is logged and
//! recorded, and the remaining handles are still attempted. Compensation
//! never changes the outcome of the run that triggered it; the report is
//! advisory.

use std::fmt;

use tracing::{debug, error};

use super::command::RepositoryCommand;
use super::replica::ReplicaHandle;
use crate::core::types::DatacenterName;

/// Outcome of one compensation pass.
///
/// Only datacenters whose compensation failed are kept; the errors
/// themselves are logged where they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationReport {
    /// Handles `compensate` was invoked on.
    pub attempted: usize,
    /// Datacenters whose compensation failed, in execution order.
    pub failed: Vec<DatacenterName>,
}

impl CompensationReport {
    /// Whether every attempted handle was compensated.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for CompensationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ok = self.attempted - self.failed.len();
        write!(f, "compensated {ok}/{} replicas", self.attempted)?;
        if !self.failed.is_empty() {
            let names: Vec<&str> = self.failed.iter().map(DatacenterName::as_str).collect();
            write!(f, "; still diverged: {}", names.join(", "))?;
        }
        Ok(())
    }
}

/// Compensate every executed handle, in execution order.
pub fn compensate_all<C>(
    command: &C,
    executed: &[&ReplicaHandle<C::Repository>],
) -> CompensationReport
where
    C: RepositoryCommand + ?Sized,
{
    let failed = executed
        .iter()
        .filter_map(|handle| {
            let datacenter = handle.datacenter();
            match command.compensate(handle) {
                Ok(()) => {
                    debug!(command = %command, datacenter = %datacenter, "compensated");
                    None
                }
                Err(e) => {
                    error!(
                        command = %command,
                        datacenter = %datacenter,
                        error = %e,
                        "compensation failed"
                    );
                    Some(datacenter.clone())
                }
            }
        })
        .collect();

    CompensationReport {
        attempted: executed.len(),
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::mock::{registry, Call, ScriptedCommand};
    use crate::engine::replica::{RepositoryLocator, RepositoryRegistry};

    fn topics() -> RepositoryRegistry<()> {
        registry("topics", "a", &["a", "b", "c"])
    }

    fn executed(registry: &RepositoryRegistry<()>) -> Vec<&ReplicaHandle<()>> {
        let kind = crate::core::types::RepositoryKind::new("topics").unwrap();
        registry.replicas_for(&kind).unwrap().iter().collect()
    }

    #[test]
    fn visits_handles_in_execution_order() {
        let registry = topics();
        let command = ScriptedCommand::new("topics");

        let report = compensate_all(&command, &executed(&registry));

        assert_eq!(command.compensated(), ["a", "b", "c"]);
        assert!(report.is_complete());
        assert_eq!(report.to_string(), "compensated 3/3 replicas");
    }

    #[test]
    fn failure_in_the_middle_does_not_stop_the_pass() {
        let registry = topics();
        let command = ScriptedCommand::new("topics").failing_compensation("b");

        let report = compensate_all(&command, &executed(&registry));

        assert_eq!(command.compensated(), ["a", "b", "c"]);
        assert_eq!(report.failed, [DatacenterName::new("b").unwrap()]);
        assert_eq!(report.to_string(), "compensated 2/3 replicas; still diverged: b");
    }

    #[test]
    fn empty_executed_makes_no_calls() {
        let command = ScriptedCommand::new("topics");

        let report = compensate_all(&command, &[]);

        assert_eq!(command.calls(), Vec::<Call>::new());
        assert_eq!(report.attempted, 0);
        assert!(report.is_complete());
    }
}
