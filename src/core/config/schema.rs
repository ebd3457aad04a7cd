//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$REGSYNC_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/regsync/config.toml`
//! 3. `~/.regsync/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Values are validated after parsing so that a bad branch name or an
//! unknown secrets provider fails at load time rather than mid-push.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;
use crate::core::types::BranchName;
use crate::forge::Visibility;

/// Keys accepted by `regsync config get|set`.
pub const KEYS: &[&str] = &[
    "api_base",
    "default_branch",
    "timeout_secs",
    "max_concurrent_blobs",
    "data_dir",
    "secrets.provider",
    "export.visibility",
    "export.org",
];

/// Upper bound for the blob fan-out. GitHub starts issuing secondary rate
/// limits well before this.
pub const MAX_CONCURRENT_BLOBS_LIMIT: usize = 64;

/// User configuration.
///
/// # Example
///
/// ```toml
/// api_base = "https://api.github.com"
/// default_branch = "main"
/// timeout_secs = 30
/// max_concurrent_blobs = 8
///
/// [secrets]
/// provider = "file"
///
/// [export]
/// visibility = "public"
/// org = "acme"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// REST API base URL
    pub api_base: Option<String>,

    /// Branch that receives published commits
    pub default_branch: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Bound on concurrent blob uploads
    pub max_concurrent_blobs: Option<usize>,

    /// Override for the data directory (bindings, secrets)
    pub data_dir: Option<PathBuf>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,

    /// Export defaults
    pub export: Option<ExportDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(api_base) = &self.api_base {
            if !(api_base.starts_with("https://") || api_base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base '{}' must be an http(s) URL",
                    api_base
                )));
            }
        }

        if let Some(branch) = &self.default_branch {
            BranchName::new(branch).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default_branch: {}", e))
            })?;
        }

        if let Some(timeout) = self.timeout_secs {
            if timeout == 0 {
                return Err(ConfigError::InvalidValue(
                    "timeout_secs must be greater than zero".to_string(),
                ));
            }
        }

        if let Some(n) = self.max_concurrent_blobs {
            if n == 0 || n > MAX_CONCURRENT_BLOBS_LIMIT {
                return Err(ConfigError::InvalidValue(format!(
                    "max_concurrent_blobs must be between 1 and {}",
                    MAX_CONCURRENT_BLOBS_LIMIT
                )));
            }
        }

        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }

        if let Some(export) = &self.export {
            export.validate()?;
        }

        Ok(())
    }

    /// Read a value by dotted key.
    ///
    /// Returns `Ok(None)` for a known key that is not set.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let value = match key {
            "api_base" => self.api_base.clone(),
            "default_branch" => self.default_branch.clone(),
            "timeout_secs" => self.timeout_secs.map(|v| v.to_string()),
            "max_concurrent_blobs" => self.max_concurrent_blobs.map(|v| v.to_string()),
            "data_dir" => self.data_dir.as_ref().map(|p| p.display().to_string()),
            "secrets.provider" => self.secrets.as_ref().and_then(|s| s.provider.clone()),
            "export.visibility" => self.export.as_ref().and_then(|e| e.visibility.clone()),
            "export.org" => self.export.as_ref().and_then(|e| e.org.clone()),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Set a value by dotted key, then validate the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unknown keys, values that do
    /// not parse, or values that fail validation. On error `self` is left
    /// unchanged.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        match key {
            "api_base" => next.api_base = Some(value.trim_end_matches('/').to_string()),
            "default_branch" => next.default_branch = Some(value.to_string()),
            "timeout_secs" => next.timeout_secs = Some(parse_number(key, value)?),
            "max_concurrent_blobs" => {
                next.max_concurrent_blobs = Some(parse_number(key, value)?)
            }
            "data_dir" => next.data_dir = Some(PathBuf::from(value)),
            "secrets.provider" => {
                next.secrets.get_or_insert_with(Default::default).provider =
                    Some(value.to_string())
            }
            "export.visibility" => {
                next.export.get_or_insert_with(Default::default).visibility =
                    Some(value.to_string())
            }
            "export.org" => {
                next.export.get_or_insert_with(Default::default).org = Some(value.to_string())
            }
            _ => return Err(unknown_key(key)),
        }
        next.validate()?;
        *self = next;
        Ok(())
    }
}

fn unknown_key(key: &str) -> ConfigError {
    ConfigError::InvalidValue(format!(
        "unknown key '{}', expected one of: {}",
        key,
        KEYS.join(", ")
    ))
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number, got '{}'", key, value)))
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider to use ("file")
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Validate the secrets configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            let valid = crate::secrets::valid_provider_names();
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Defaults applied by `regsync export`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExportDefaults {
    /// "public" or "private"
    pub visibility: Option<String>,

    /// Organization that owns new repositories (user account if unset)
    pub org: Option<String>,
}

impl ExportDefaults {
    /// Validate the export defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(visibility) = &self.visibility {
            Visibility::parse(visibility).ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "invalid export visibility '{}', must be 'public' or 'private'",
                    visibility
                ))
            })?;
        }
        if let Some(org) = &self.org {
            if org.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "export.org cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
