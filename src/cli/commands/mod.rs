//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Opens a [`Session`] from the configuration
//! 3. Calls the engine (mutations) or reads replicas directly (queries)
//! 4. Formats and displays output
//!
//! Handlers do NOT write to replicas directly.

mod completion;
mod get;
mod mutate;
mod status;

// Re-export command functions for testing and direct invocation
pub use completion::completion;
pub use get::get;
pub use mutate::{put, remove};
pub use status::status;

use anyhow::{Context as _, Result};
use tracing::debug;

use super::args::Command;
use super::Context;
use crate::core::auth::{CliUser, RequestUser};
use crate::core::config::Config;
use crate::engine::{ExecuteError, MultiDatacenterExecutor, RepositoryCommand, RepositoryRegistry};
use crate::store::FileReplica;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Put { kind, key, value } => mutate::put(ctx, &kind, &key, &value),
        Command::Remove { kind, key } => mutate::remove(ctx, &kind, &key),
        Command::Get { kind, key } => get::get(ctx, &kind, &key),
        Command::Status => status::status(ctx),
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Configuration, replicas and caller for one invocation.
pub struct Session {
    pub config: Config,
    pub executor: MultiDatacenterExecutor<RepositoryRegistry<FileReplica>>,
    pub user: CliUser,
}

impl Session {
    /// Load the configuration and register every configured replica.
    pub fn open(ctx: &Context) -> Result<Self> {
        let config =
            Config::load(ctx.config.as_deref()).context("failed to load configuration")?;
        let registry = open_registry(&config)?;
        let user = CliUser::resolve(ctx.user.clone(), config.admins());

        debug!(
            user = user.username(),
            admin = user.is_admin(),
            config = ?config.path(),
            rollback = config.rollback_enabled(),
            "session opened"
        );

        Ok(Self {
            executor: MultiDatacenterExecutor::new(registry, config.rollback_enabled()),
            config,
            user,
        })
    }

    /// Run a mutation on behalf of the session's user.
    pub fn run<C>(&self, command: &C) -> Result<(), ExecuteError>
    where
        C: RepositoryCommand<Repository = FileReplica>,
    {
        self.executor.execute_by_user(command, &self.user)
    }
}

/// Build a registry holding one [`FileReplica`] per configured datacenter
/// for every configured kind.
pub fn open_registry(config: &Config) -> Result<RepositoryRegistry<FileReplica>> {
    let local = config.local_datacenter()?;
    let datacenters = config.datacenters()?;

    let mut registry = RepositoryRegistry::new(local);
    for kind in config.kinds()? {
        for (name, root) in &datacenters {
            registry.register(kind.clone(), name.clone(), FileReplica::new(root))?;
        }
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::RepositoryKind;
    use crate::engine::RepositoryLocator;

    #[test]
    fn registry_covers_every_kind_and_datacenter() {
        let config = Config::from_toml(
            r#"
            local_datacenter = "dc2"
            kinds = ["topics", "groups"]

            [[datacenters]]
            name = "dc1"
            path = "/srv/dc1"

            [[datacenters]]
            name = "dc2"
            path = "/srv/dc2"
            "#,
            None,
        )
        .unwrap();

        let registry = open_registry(&config).unwrap();
        assert_eq!(registry.kinds().len(), 2);

        let topics = RepositoryKind::new("topics").unwrap();
        let names: Vec<_> = registry
            .replicas_for(&topics)
            .unwrap()
            .iter()
            .map(|h| h.datacenter().as_str())
            .collect();
        assert_eq!(names, ["dc1", "dc2"]);
        assert_eq!(
            registry.local_replica_for(&topics).unwrap().repository().root(),
            std::path::Path::new("/srv/dc2")
        );
    }

    #[test]
    fn registry_requires_datacenters() {
        let config = Config::from_toml("local_datacenter = \"dc1\"", None).unwrap();
        assert!(open_registry(&config).is_err());
    }
}
