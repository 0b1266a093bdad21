//! cli::commands::status
//!
//! Reachability and per-kind content digests for every datacenter.
//!
//! Digests only depend on keys and values, so two replicas holding the
//! same entries show the same digest. A kind whose reachable replicas
//! disagree is flagged as diverged.

use std::collections::BTreeSet;

use anyhow::Result;

use super::Session;
use crate::cli::Context;
use crate::core::auth::RequestUser;
use crate::core::types::{ContentDigest, DatacenterName, RepositoryKind};
use crate::store::FileReplica;
use crate::ui::output;

/// Status of one replica of one kind.
enum ReplicaState {
    Unreachable,
    Error(String),
    Ok { entries: usize, digest: ContentDigest },
}

fn inspect(replica: &FileReplica, kind: &RepositoryKind) -> ReplicaState {
    if !replica.is_reachable() {
        return ReplicaState::Unreachable;
    }
    let result = replica
        .list(kind)
        .and_then(|entries| Ok((entries.len(), replica.digest(kind)?)));
    match result {
        Ok((entries, digest)) => ReplicaState::Ok { entries, digest },
        Err(e) => ReplicaState::Error(e.to_string()),
    }
}

/// Print the status table.
pub fn status(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let datacenters = session.config.datacenters()?;
    let local = session.config.local_datacenter()?;

    let header: Vec<(&str, String)> = vec![
        (
            "config",
            session
                .config
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<none>".to_string()),
        ),
        ("user", describe_user(&session)),
        ("rollback", session.config.rollback_enabled().to_string()),
    ];
    output::print(output::format_rows(&header, ""), ctx.verbosity);

    for kind in session.config.kinds()? {
        let mut rows: Vec<(String, String)> = Vec::new();
        let mut digests = BTreeSet::new();

        for (name, root) in &datacenters {
            let replica = FileReplica::new(root);
            let cell = match inspect(&replica, &kind) {
                ReplicaState::Unreachable => "unreachable".to_string(),
                ReplicaState::Error(e) => format!("error: {e}"),
                ReplicaState::Ok { entries, digest } => {
                    digests.insert(digest.as_str().to_string());
                    format!("{entries} entries  {}", digest.short())
                }
            };
            rows.push((label(name, &local), cell));
        }

        let verdict = if digests.len() > 1 { "  (diverged)" } else { "" };
        output::print(format!("\n{kind}{verdict}"), ctx.verbosity);
        output::print(output::format_rows(&rows, "  "), ctx.verbosity);
    }

    Ok(())
}

fn describe_user(session: &Session) -> String {
    if session.user.is_admin() {
        format!("{} (admin)", session.user.username())
    } else {
        session.user.username().to_string()
    }
}

fn label(name: &DatacenterName, local: &DatacenterName) -> String {
    if name == local {
        format!("{name} *")
    } else {
        name.to_string()
    }
}
