//! core::types
//!
//! Strong domain types used throughout multidc.
//!
//! # Design
//!
//! Identifiers that end up in log lines, error messages, or file paths are
//! validated once at construction time. Everything downstream can assume a
//! `DatacenterName`, `RepositoryKind`, or `EntryKey` is well-formed.
//!
//! # Example
//!
//! ```
//! use multidc::core::types::{DatacenterName, EntryKey, RepositoryKind};
//!
//! let dc = DatacenterName::new("dc-east").unwrap();
//! let kind = RepositoryKind::new("topics").unwrap();
//! let key = EntryKey::new("pl.allegro.orders").unwrap();
//!
//! // Invalid constructions fail at creation time
//! assert!(DatacenterName::new("").is_err());
//! assert!(EntryKey::new("../escape").is_err());
//! # let _ = (dc, kind, key);
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// Maximum length of any validated identifier.
const MAX_NAME_LEN: usize = 128;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid datacenter name: {0}")]
    InvalidDatacenterName(String),

    #[error("invalid repository kind: {0}")]
    InvalidRepositoryKind(String),

    #[error("invalid entry key: {0}")]
    InvalidEntryKey(String),
}

/// Shared identifier rules.
///
/// Identifiers are used as directory and file names by the file store, so
/// they are restricted to `[A-Za-z0-9._-]`, cannot start with `.` or `-`,
/// and are capped at 128 characters.
fn check_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("cannot be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("cannot be longer than {MAX_NAME_LEN} characters"));
    }
    if name.starts_with('.') {
        return Err("cannot start with '.'".into());
    }
    if name.starts_with('-') {
        return Err("cannot start with '-'".into());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(format!("cannot contain '{}'", c.escape_default()));
    }
    Ok(())
}

/// The name of a datacenter owning one replica.
///
/// # Example
///
/// ```
/// use multidc::core::types::DatacenterName;
///
/// let name = DatacenterName::new("dc1").unwrap();
/// assert_eq!(name.as_str(), "dc1");
///
/// assert!(DatacenterName::new(".hidden").is_err());
/// assert!(DatacenterName::new("has space").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatacenterName(String);

impl DatacenterName {
    /// Create a new validated datacenter name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidDatacenterName` if the name breaks the
    /// identifier rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        check_identifier(&name)
            .map_err(|reason| TypeError::InvalidDatacenterName(format!("'{name}' {reason}")))?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DatacenterName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<DatacenterName> for String {
    fn from(name: DatacenterName) -> Self {
        name.0
    }
}

impl AsRef<str> for DatacenterName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DatacenterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Selector naming one family of replicas (e.g. `topics`).
///
/// A command targets exactly one kind; the locator resolves the kind to
/// the ordered per-datacenter replica set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepositoryKind(String);

impl RepositoryKind {
    /// Create a new validated repository kind.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidRepositoryKind` if the kind breaks the
    /// identifier rules.
    pub fn new(kind: impl Into<String>) -> Result<Self, TypeError> {
        let kind = kind.into();
        check_identifier(&kind)
            .map_err(|reason| TypeError::InvalidRepositoryKind(format!("'{kind}' {reason}")))?;
        Ok(Self(kind))
    }

    /// Get the kind as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RepositoryKind {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RepositoryKind> for String {
    fn from(kind: RepositoryKind) -> Self {
        kind.0
    }
}

impl AsRef<str> for RepositoryKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Key of a single entry in a file-backed replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntryKey(String);

impl EntryKey {
    /// Create a new validated entry key.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidEntryKey` if the key breaks the identifier
    /// rules.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        check_identifier(&key)
            .map_err(|reason| TypeError::InvalidEntryKey(format!("'{key}' {reason}")))?;
        Ok(Self(key))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntryKey {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<EntryKey> for String {
    fn from(key: EntryKey) -> Self {
        key.0
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A UTC timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTimestamp(chrono::DateTime<chrono::Utc>);

impl UtcTimestamp {
    /// Create a timestamp for the current moment.
    pub fn now() -> Self {
        Self(chrono::Utc::now())
    }

    /// Get the underlying datetime.
    pub fn as_datetime(&self) -> &chrono::DateTime<chrono::Utc> {
        &self.0
    }
}

impl std::fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A stable hash over the entries of one replica kind.
///
/// Two replicas holding the same key/value pairs produce the same digest,
/// which is how `mdc status` shows divergence between datacenters.
///
/// # Example
///
/// ```
/// use multidc::core::types::{ContentDigest, EntryKey};
///
/// let a = vec![(EntryKey::new("a").unwrap(), "1".to_string())];
/// assert_eq!(ContentDigest::compute(&a), ContentDigest::compute(&a));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute a digest from a set of (key, value) pairs.
    ///
    /// Pairs are sorted by key before hashing so input order does not matter.
    pub fn compute(entries: &[(EntryKey, String)]) -> Self {
        let mut sorted: Vec<_> = entries.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hasher = Sha256::new();
        for (key, value) in sorted {
            hasher.update(key.as_str().as_bytes());
            hasher.update(b"\0");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }

        Self(hex::encode(hasher.finalize()))
    }

    /// Get the digest as a hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
