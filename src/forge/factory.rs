//! forge::factory
//!
//! Host selection and creation.
//!
//! # Design
//!
//! Commands use [`create_host`] instead of constructing a specific host
//! implementation, so the sync engine only ever sees `dyn GitHost`.
//!
//! # Example
//!
//! ```ignore
//! use regsync::forge::create_host;
//!
//! let host = create_host(config.api_base(), config.timeout(), provider)?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use super::github::{GitHubHost, DEFAULT_API_BASE};
use super::traits::{ForgeError, GitHost};
use crate::auth::TokenProvider;

/// Label used for the host in tokens, prompts and messages.
///
/// `https://api.github.com` maps to `github.com`; an Enterprise API base
/// maps to its host name.
///
/// # Example
///
/// ```
/// use regsync::forge::host_label;
///
/// assert_eq!(host_label("https://api.github.com"), "github.com");
/// assert_eq!(host_label("https://ghe.example.com/api/v3"), "ghe.example.com");
/// ```
pub fn host_label(api_base: &str) -> String {
    if api_base.trim_end_matches('/') == DEFAULT_API_BASE {
        return "github.com".to_string();
    }
    let without_scheme = api_base
        .strip_prefix("https://")
        .or_else(|| api_base.strip_prefix("http://"))
        .unwrap_or(api_base);
    without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme)
        .to_string()
}

/// Create the host for an API base.
///
/// # Errors
///
/// Returns `ForgeError::NetworkError` if the HTTP client cannot be built.
pub fn create_host(
    api_base: &str,
    timeout: Duration,
    provider: Arc<dyn TokenProvider>,
) -> Result<Arc<dyn GitHost>, ForgeError> {
    let host = GitHubHost::new_with_provider(provider, api_base, timeout)?;
    Ok(Arc::new(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenProvider;

    #[test]
    fn label_for_public_github() {
        assert_eq!(host_label("https://api.github.com/"), "github.com");
    }

    #[test]
    fn label_for_enterprise() {
        assert_eq!(
            host_label("https://github.example.com/api/v3"),
            "github.example.com"
        );
        assert_eq!(host_label("http://127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[test]
    fn creates_github_host() {
        let provider: Arc<dyn TokenProvider> =
            Arc::new(StaticTokenProvider::new("github.com", "token"));
        let host = create_host(DEFAULT_API_BASE, Duration::from_secs(5), provider).unwrap();
        assert_eq!(host.name(), "github");
    }
}
