//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--config <path>`: Use this config file instead of the default lookup
//! - `--user <name>`: Act as this user (default `$MDC_USER`, then `$USER`)
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// mdc - apply repository changes to every datacenter replica
#[derive(Parser, Debug)]
#[command(name = "mdc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Act as this user; administrators skip rollback and push past
    /// unreachable datacenters
    #[arg(long, global = true, value_name = "NAME")]
    pub user: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// The acting user name.
    pub fn user_name(&self) -> String {
        self.user
            .clone()
            .or_else(|| std::env::var("MDC_USER").ok())
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Insert or replace an entry on every datacenter
    #[command(
        long_about = "Insert or replace an entry on every datacenter.\n\n\
            The local replica is snapshotted first (unless rollback is disabled or \
            you are an administrator). If any datacenter fails, the change is rolled \
            back on every datacenter it was attempted on.",
        after_help = "\
EXAMPLES:
    mdc put topics orders '{\"retention\": 7}'
    mdc --user admin put topics orders v2"
    )]
    Put {
        /// Repository kind (e.g. topics)
        kind: String,
        /// Entry key
        key: String,
        /// New value
        value: String,
    },

    /// Remove an entry from every datacenter
    Remove {
        /// Repository kind
        kind: String,
        /// Entry key
        key: String,
    },

    /// Show an entry as stored in each datacenter
    Get {
        /// Repository kind
        kind: String,
        /// Entry key
        key: String,
    },

    /// Show reachability and content digests per datacenter
    Status,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["mdc", "put", "topics", "k", "v", "--user", "alice", "-q"])
            .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(cli.quiet);
        assert!(matches!(cli.command, Command::Put { .. }));
    }

    #[test]
    fn explicit_user_wins() {
        let cli = Cli::try_parse_from(["mdc", "--user", "bob", "status"]).unwrap();
        assert_eq!(cli.user_name(), "bob");
    }
}
