//! cli
//!
//! Command-line interface layer for mdc.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Delegate to command handlers
//!
//! Handlers never write to replicas directly; mutations go through
//! [`crate::engine::exec::MultiDatacenterExecutor`].

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::path::PathBuf;

use anyhow::Result;

use crate::logging;
use crate::ui::output::Verbosity;

/// Per-invocation settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit config file, if any
    pub config: Option<PathBuf>,
    /// Acting user name
    pub user: String,
    /// Output verbosity
    pub verbosity: Verbosity,
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    logging::init(verbosity);

    let ctx = Context {
        config: cli.config.clone(),
        user: cli.user_name(),
        verbosity,
    };

    commands::dispatch(cli.command, &ctx)
}
