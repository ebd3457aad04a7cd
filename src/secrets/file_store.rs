//! secrets::file_store
//!
//! File-based secret storage at `<data_dir>/secrets.toml`.
//!
//! On Unix the file is created with mode 0600 before any content is
//! written. Every write goes to a temp file that is synced and renamed over
//! the original.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

use super::traits::{SecretError, SecretStore};
use crate::core::paths::DataPaths;

/// File-based secret storage.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store secrets in `secrets.toml` inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: DataPaths::new(data_dir.to_path_buf()).secrets_path(),
        }
    }

    /// Store secrets at an explicit file path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the secrets file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SecretError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read secrets file: {}",
                    e.kind()
                )))
            }
        };

        // The toml error includes the offending line, which may hold a secret.
        toml::from_str(&content)
            .map_err(|_| SecretError::ReadError("cannot parse secrets file".into()))
    }

    fn write_all(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        let write_err = |what: &str, e: std::io::Error| {
            SecretError::WriteError(format!("{}: {}", what, e.kind()))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err("cannot create directory", e))?;
        }

        let content = toml::to_string_pretty(secrets)
            .map_err(|_| SecretError::WriteError("cannot serialize secrets".into()))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut options = OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            options.mode(0o600);

            let mut file = options
                .open(&temp_path)
                .map_err(|e| write_err("cannot create temp file", e))?;
            file.write_all(content.as_bytes())
                .map_err(|e| write_err("cannot write secrets", e))?;
            file.sync_all()
                .map_err(|e| write_err("cannot sync to disk", e))?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| write_err("cannot rename temp file", e))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_all()?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_all(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.read_all()?;
        if secrets.remove(key).is_none() && !self.path.exists() {
            return Ok(());
        }
        self.write_all(&secrets)
    }
}
