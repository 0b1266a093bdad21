//! engine
//!
//! Coordinates one logical mutation across per-datacenter replicas.
//!
//! # Architecture
//!
//! ```text
//! caller -> Executor -> Locator (resolve replicas)
//!                    -> Command::snapshot (local replica, if compensating)
//!                    -> Command::apply (each replica, in order)
//!                    -> Command::compensate (executed replicas, on failure)
//! ```
//!
//! The engine owns the protocol and the failure policies. Replica discovery,
//! the mutation itself, and snapshot storage belong to the locator and the
//! command.

pub mod command;
pub mod compensation;
pub mod exec;
pub mod mock;
pub mod replica;

// Re-exports for convenience
pub use command::{
    ApplyError, BoxError, CompensationError, RepositoryCommand, RepositoryUnavailable,
    SnapshotError,
};
pub use compensation::{compensate_all, CompensationReport};
pub use exec::{ExecuteError, ExecutionPolicy, MultiDatacenterExecutor};
pub use replica::{LocateError, ReplicaHandle, RepositoryLocator, RepositoryRegistry};
