//! multidc - coordinated writes across datacenter replicas
//!
//! A repository (topics, groups, subscriptions, ...) is replicated once per
//! datacenter. `multidc` applies one mutation to every replica in turn,
//! snapshotting the local replica first so that a failed run can be
//! compensated on every replica the mutation was attempted on.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Replica lookup, the command contract, the executor and
//!   compensation
//! - [`store`] - File-backed replicas and the concrete put/remove commands
//! - [`core`] - Domain types, acting user, configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`ui`] - Output formatting
//!
//! # Guarantees
//!
//! 1. A replica is recorded as executed before `apply` is attempted on it
//! 2. Compensation covers exactly the recorded replicas, in execution order
//! 3. A failing compensation never changes the outcome of a run
//! 4. Errors reach the caller wrapped exactly once, naming command and
//!    datacenter

pub mod cli;
pub mod core;
pub mod engine;
pub mod logging;
pub mod store;
pub mod ui;
