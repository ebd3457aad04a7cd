//! auth
//!
//! Bearer tokens for host adapters.
//!
//! # Components
//!
//! - [`TokenProvider`] - Trait for providing bearer tokens to host adapters
//! - [`StoredTokenProvider`] - Reads a personal access token from a [`SecretStore`]
//! - [`StaticTokenProvider`] - Wraps a token supplied by the environment
//!
//! # Security
//!
//! Tokens never appear in logs, error messages, or `Debug` output. All
//! providers implement `Debug` by hand to redact them.
//!
//! [`SecretStore`]: crate::secrets::SecretStore

mod errors;
mod provider;

pub use errors::AuthError;
pub use provider::{StaticTokenProvider, StoredTokenProvider, GITHUB_TOKEN_KEY};

/// Trait for providing bearer tokens to host adapters.
///
/// Implementors must never log or expose token values.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns the bearer token to send with the next request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token exists
    /// - [`AuthError::SecretStore`] if the backing store cannot be read
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if a token is available without fetching it.
    fn is_authenticated(&self) -> bool;

    /// Get the host this provider authenticates for.
    fn host(&self) -> &str;

    /// Whether asking again after an auth failure can yield a different token.
    ///
    /// Host adapters retry a request once on 401/403 only when this is true.
    fn refreshable(&self) -> bool {
        false
    }
}
