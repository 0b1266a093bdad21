//! cli::commands::get
//!
//! Show one entry as each datacenter holds it. Read-only; unreachable
//! replicas are shown rather than treated as errors.

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::core::types::{EntryKey, RepositoryKind};
use crate::engine::RepositoryLocator;
use crate::ui::output;

/// Print `<datacenter>  <value>` for every replica of `kind`.
pub fn get(ctx: &Context, kind: &str, key: &str) -> Result<()> {
    let kind = RepositoryKind::new(kind)?;
    let key = EntryKey::new(key)?;
    let session = Session::open(ctx)?;

    let mut rows = Vec::new();
    for handle in session.executor.locator().replicas_for(&kind)? {
        let cell = match handle.repository().get(&kind, &key) {
            Ok(Some(entry)) => entry.value,
            Ok(None) => "<missing>".to_string(),
            Err(e) if e.is_unavailable() => "<unavailable>".to_string(),
            Err(e) => {
                output::warn(format!("{}: {e}", handle.datacenter()), ctx.verbosity);
                "<error>".to_string()
            }
        };
        rows.push((handle.datacenter().clone(), cell));
    }

    output::print(format!("{kind}/{key}"), ctx.verbosity);
    output::print(output::format_rows(&rows, "  "), ctx.verbosity);
    Ok(())
}
