//! core::auth
//!
//! Caller identity as seen by the coordinator.
//!
//! How a caller is authenticated is not multidc's concern. The coordinator
//! only needs one bit from the request context: whether the caller is an
//! administrator. Administrators get the best-effort policy (see
//! [`crate::engine::exec::ExecutionPolicy`]).

/// The identity attached to a mutation request.
pub trait RequestUser {
    /// Name of the caller, used in log fields.
    fn username(&self) -> &str;

    /// Whether the caller holds administrator privilege.
    fn is_admin(&self) -> bool;
}

/// A caller resolved from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliUser {
    name: String,
    admin: bool,
}

impl CliUser {
    /// Create a user with an explicit privilege flag.
    pub fn new(name: impl Into<String>, admin: bool) -> Self {
        Self {
            name: name.into(),
            admin,
        }
    }

    /// Resolve a user against the configured administrator list.
    pub fn resolve(name: impl Into<String>, admins: &[String]) -> Self {
        let name = name.into();
        let admin = admins.iter().any(|a| a == &name);
        Self { name, admin }
    }
}

impl RequestUser for CliUser {
    fn username(&self) -> &str {
        &self.name
    }

    fn is_admin(&self) -> bool {
        self.admin
    }
}
