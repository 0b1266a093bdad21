//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. The `--config` path, if given (must exist)
//! 2. `$MULTIDC_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/multidc/config.toml`
//! 4. `~/.multidc/config.toml`
//!
//! A missing config file is not an error; defaults are used and commands
//! that need datacenters report that none are configured.
//!
//! # Example
//!
//! ```no_run
//! use multidc::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("rollback enabled: {}", config.rollback_enabled());
//! for (name, root) in config.datacenters().unwrap() {
//!     println!("{} -> {}", name, root.display());
//! }
//! ```

pub mod schema;

pub use schema::{ConfigFile, DatacenterConfig, DEFAULT_KINDS};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::types::{DatacenterName, RepositoryKind};

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no datacenters configured")]
    NoDatacenters,

    #[error("local_datacenter is not configured")]
    NoLocalDatacenter,
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    /// Where the file was loaded from (if anywhere)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration, honoring an explicit path first.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit path cannot be read, or if a
    /// discovered config file cannot be parsed or fails validation.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        match Self::discover() {
            Some(path) => Self::from_path(&path),
            None => Ok(Self::default()),
        }
    }

    /// Find the first existing config file in the standard locations.
    fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("MULTIDC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("multidc/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".multidc/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read, parse and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::from_toml(&contents, Some(path))
    }

    /// Parse and validate config contents.
    ///
    /// `origin` is the file the contents came from; relative datacenter
    /// paths are resolved against its directory.
    pub fn from_toml(contents: &str, origin: Option<&Path>) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: origin.map(Path::to_path_buf).unwrap_or_default(),
            message: e.to_string(),
        })?;
        file.validate()?;

        Ok(Self {
            file,
            path: origin.map(Path::to_path_buf),
        })
    }

    /// Path of the loaded config file, if one was found.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether non-admin runs snapshot and compensate.
    ///
    /// Defaults to `true` if not configured.
    pub fn rollback_enabled(&self) -> bool {
        self.file.rollback_enabled.unwrap_or(true)
    }

    /// Users with administrator privilege.
    pub fn admins(&self) -> &[String] {
        &self.file.admins
    }

    /// The datacenter whose replica is snapshotted.
    pub fn local_datacenter(&self) -> Result<DatacenterName, ConfigError> {
        let name = self
            .file
            .local_datacenter
            .as_deref()
            .ok_or(ConfigError::NoLocalDatacenter)?;
        DatacenterName::new(name).map_err(|e| ConfigError::InvalidValue(e.to_string()))
    }

    /// Configured datacenters in application order, with replica roots
    /// resolved against the config file's directory.
    pub fn datacenters(&self) -> Result<Vec<(DatacenterName, PathBuf)>, ConfigError> {
        if self.file.datacenters.is_empty() {
            return Err(ConfigError::NoDatacenters);
        }

        let base = self.path.as_deref().and_then(Path::parent);
        self.file
            .datacenters
            .iter()
            .map(|dc| {
                let name = DatacenterName::new(&dc.name)
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;
                let root = match base {
                    Some(base) if dc.path.is_relative() => base.join(&dc.path),
                    _ => dc.path.clone(),
                };
                Ok((name, root))
            })
            .collect()
    }

    /// Repository kinds to register.
    ///
    /// Defaults to [`DEFAULT_KINDS`] if not configured.
    pub fn kinds(&self) -> Result<Vec<RepositoryKind>, ConfigError> {
        let to_kind =
            |k: &str| RepositoryKind::new(k).map_err(|e| ConfigError::InvalidValue(e.to_string()));
        match &self.file.kinds {
            Some(kinds) => kinds.iter().map(|k| to_kind(k.as_str())).collect(),
            None => DEFAULT_KINDS.iter().map(|k| to_kind(*k)).collect(),
        }
    }
}
