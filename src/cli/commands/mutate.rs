//! cli::commands::mutate
//!
//! `put` and `remove`: the coordinated mutations.
//!
//! Both run through [`Session::run`], so the caller's privilege selects the
//! execution policy. Failures come back as an
//! [`ExecuteError`](crate::engine::ExecuteError) naming the command and the
//! datacenter that failed.

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::core::types::{EntryKey, RepositoryKind};
use crate::store::{PutEntry, RemoveEntry};
use crate::ui::output;

/// Insert or replace an entry on every datacenter.
pub fn put(ctx: &Context, kind: &str, key: &str, value: &str) -> Result<()> {
    let command = PutEntry::new(RepositoryKind::new(kind)?, EntryKey::new(key)?, value);
    let session = Session::open(ctx)?;

    session.run(&command)?;
    output::print(format!("{command}: applied"), ctx.verbosity);
    Ok(())
}

/// Remove an entry from every datacenter.
pub fn remove(ctx: &Context, kind: &str, key: &str) -> Result<()> {
    let command = RemoveEntry::new(RepositoryKind::new(kind)?, EntryKey::new(key)?);
    let session = Session::open(ctx)?;

    session.run(&command)?;
    output::print(format!("{command}: applied"), ctx.verbosity);
    Ok(())
}
