//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$REGSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/regsync/config.toml`
//! 3. `~/.regsync/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use regsync::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("API: {}", config.api_base());
//! println!("Branch: {}", config.default_branch());
//! println!("Blob fan-out: {}", config.max_concurrent_blobs());
//! ```

pub mod schema;

pub use schema::{ExportDefaults, GlobalConfig, SecretsConfig, KEYS};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::types::BranchName;
use crate::forge::Visibility;

/// Default REST API base.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default bound on concurrent blob uploads.
pub const DEFAULT_MAX_CONCURRENT_BLOBS: usize = 8;

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

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub global: GlobalConfig,
    /// Path the configuration was loaded from (if any)
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated. A missing file is not an error (defaults are used).
    pub fn load() -> Result<Config, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let global = Self::read_config(path)?;
        global.validate()?;
        Ok(Config {
            global,
            path: Some(path.to_path_buf()),
        })
    }

    /// Find the first existing config file in search order.
    fn locate() -> Option<PathBuf> {
        // 1. $REGSYNC_CONFIG
        if let Ok(path) = std::env::var("REGSYNC_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. $XDG_CONFIG_HOME/regsync/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("regsync/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. ~/.regsync/config.toml
        let path = dirs::home_dir()?.join(".regsync/config.toml");
        path.exists().then_some(path)
    }

    fn read_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Get the path writes go to.
    ///
    /// This is the file the configuration was loaded from, or
    /// `$REGSYNC_CONFIG`, or `~/.regsync/config.toml`.
    pub fn write_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        if let Ok(path) = std::env::var("REGSYNC_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".regsync/config.toml"))
    }

    /// Write the configuration atomically and remember where it went.
    ///
    /// Creates parent directories if needed. Uses atomic write
    /// (write to temp file, then rename) to prevent corruption.
    pub fn save(&mut self) -> Result<PathBuf, ConfigError> {
        let path = self.write_path()?;
        write_config_atomic(&path, &self.global)?;
        self.path = Some(path.clone());
        Ok(path)
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// REST API base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.global
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    /// Branch that receives published commits. Defaults to `main`.
    pub fn default_branch(&self) -> BranchName {
        self.global
            .default_branch
            .as_deref()
            .and_then(|b| BranchName::new(b).ok())
            .unwrap_or_default()
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.global.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Bound on concurrent blob uploads.
    pub fn max_concurrent_blobs(&self) -> usize {
        self.global
            .max_concurrent_blobs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_BLOBS)
    }

    /// Data directory holding bindings and file-backed secrets.
    ///
    /// Defaults to `~/.regsync`.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.global.data_dir {
            return Ok(dir.clone());
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".regsync"))
    }

    /// Secrets provider. Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.global
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or(crate::secrets::DEFAULT_PROVIDER)
    }

    /// Visibility of repositories created by export. Defaults to public.
    pub fn export_visibility(&self) -> Visibility {
        self.global
            .export
            .as_ref()
            .and_then(|e| e.visibility.as_deref())
            .and_then(Visibility::parse)
            .unwrap_or(Visibility::Public)
    }

    /// Organization that owns exported repositories, if configured.
    pub fn export_org(&self) -> Option<&str> {
        self.global.export.as_ref().and_then(|e| e.org.as_deref())
    }

    /// Get the path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Write a TOML file atomically.
fn write_config_atomic<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    // Temp file in the same directory so the rename stays on one filesystem
    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
