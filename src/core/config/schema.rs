//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Example
//!
//! ```toml
//! rollback_enabled = true
//! local_datacenter = "dc1"
//! admins = ["alice"]
//! kinds = ["topics", "subscriptions"]
//!
//! [[datacenters]]
//! name = "dc1"
//! path = "replicas/dc1"
//!
//! [[datacenters]]
//! name = "dc2"
//! path = "/mnt/dc2/multidc"
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: datacenter names and kinds must be
//! valid identifiers, datacenter names must be unique, and the local
//! datacenter must be one of the configured datacenters.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{DatacenterName, RepositoryKind};

/// Kinds registered when the config does not list any.
pub const DEFAULT_KINDS: [&str; 3] = ["groups", "topics", "subscriptions"];

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Take a snapshot and compensate on failure for non-admin runs
    pub rollback_enabled: Option<bool>,

    /// Datacenter whose replica is snapshotted before mutation
    pub local_datacenter: Option<String>,

    /// Users treated as administrators
    pub admins: Vec<String>,

    /// Repository kinds to register for every datacenter
    pub kinds: Option<Vec<String>>,

    /// Replicas in application order
    pub datacenters: Vec<DatacenterConfig>,
}

/// One datacenter-local replica.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatacenterConfig {
    /// Datacenter name
    pub name: String,

    /// Replica root directory
    pub path: PathBuf,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for dc in &self.datacenters {
            DatacenterName::new(&dc.name)
                .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            if !seen.insert(dc.name.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "datacenter '{}' is configured more than once",
                    dc.name
                )));
            }
        }

        if let Some(local) = &self.local_datacenter {
            DatacenterName::new(local).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
            if !self.datacenters.is_empty() && !seen.contains(local.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "local datacenter '{}' is not among the configured datacenters",
                    local
                )));
            }
        }

        if let Some(kinds) = &self.kinds {
            let mut seen_kinds = HashSet::new();
            for kind in kinds {
                RepositoryKind::new(kind).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
                if !seen_kinds.insert(kind.as_str()) {
                    return Err(ConfigError::InvalidValue(format!(
                        "repository kind '{kind}' is listed more than once"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(name: &str) -> DatacenterConfig {
        DatacenterConfig {
            name: name.to_string(),
            path: PathBuf::from(format!("/tmp/{name}")),
        }
    }

    #[test]
    fn default_is_valid() {
        assert!(ConfigFile::default().validate().is_ok());
    }

    #[test]
    fn duplicate_datacenter_rejected() {
        let config = ConfigFile {
            datacenters: vec![dc("dc1"), dc("dc1")],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn duplicate_kind_rejected() {
        let config = ConfigFile {
            kinds: Some(vec!["topics".into(), "groups".into(), "topics".into()]),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
        assert!(err.to_string().contains("'topics' is listed more than once"));
    }

    #[test]
    fn unknown_local_datacenter_rejected() {
        let config = ConfigFile {
            local_datacenter: Some("dc3".into()),
            datacenters: vec![dc("dc1"), dc("dc2")],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_kind_rejected() {
        let config = ConfigFile {
            kinds: Some(vec!["top ics".into()]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let parsed: Result<ConfigFile, _> = toml::from_str("rollback = true");
        assert!(parsed.is_err());
    }

    #[test]
    fn parses_datacenter_tables() {
        let parsed: ConfigFile = toml::from_str(
            r#"
            local_datacenter = "dc1"

            [[datacenters]]
            name = "dc1"
            path = "a"

            [[datacenters]]
            name = "dc2"
            path = "b"
            "#,
        )
        .unwrap();
        assert_eq!(parsed.datacenters.len(), 2);
        assert_eq!(parsed.datacenters[1].name, "dc2");
        assert!(parsed.validate().is_ok());
    }
}
