//! secrets
//!
//! Secret storage for host tokens.
//!
//! Secrets go through the [`SecretStore`] trait. The only provider shipped is
//! [`FileSecretStore`], a TOML file inside the regsync data directory
//! written with owner-only permissions.
//!
//! Secrets are never logged or included in error messages.
//!
//! # Example
//!
//! ```ignore
//! use regsync::secrets::create_store;
//!
//! let store = create_store("file", &data_dir)?;
//! store.set("github.pat", "ghp_xxxx...")?;
//! ```

mod file_store;
mod traits;

use std::path::Path;

pub use file_store::FileSecretStore;
pub use traits::{SecretError, SecretStore};

/// The default secret store provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Names accepted for the `secrets.provider` config key.
pub fn valid_provider_names() -> &'static [&'static str] {
    &["file"]
}

/// Create a secret store based on the provider name.
///
/// `data_dir` is the regsync data directory; file-backed stores keep their
/// data underneath it.
///
/// # Errors
///
/// Returns [`SecretError::ProviderNotAvailable`] for unknown providers.
pub fn create_store(provider: &str, data_dir: &Path) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::in_dir(data_dir))),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: {})",
            other,
            valid_provider_names().join(", ")
        ))),
    }
}
