//! auth::provider
//!
//! [`TokenProvider`] implementations.
//!
//! [`StoredTokenProvider`] re-reads the secret store on every call, so a
//! token replaced by a concurrent `regsync auth` is picked up by the next
//! request. That makes it the refreshable provider: host adapters retry once
//! on an auth failure.

use super::{AuthError, TokenProvider};
use crate::secrets::SecretStore;

/// Secret key for a GitHub personal access token.
pub const GITHUB_TOKEN_KEY: &str = "github.pat";

/// Token provider backed by a [`SecretStore`].
pub struct StoredTokenProvider {
    host: String,
    store: Box<dyn SecretStore>,
}

impl StoredTokenProvider {
    /// Create a provider reading [`GITHUB_TOKEN_KEY`] from `store`.
    pub fn new(host: impl Into<String>, store: Box<dyn SecretStore>) -> Self {
        Self {
            host: host.into(),
            store,
        }
    }
}

impl std::fmt::Debug for StoredTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredTokenProvider")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        match self.store.get(GITHUB_TOKEN_KEY)? {
            Some(token) if !token.trim().is_empty() => Ok(token),
            Some(_) => Err(AuthError::InvalidToken("stored token is empty".into())),
            None => Err(AuthError::NotAuthenticated(self.host.clone())),
        }
    }

    fn is_authenticated(&self) -> bool {
        self.store.exists(GITHUB_TOKEN_KEY).unwrap_or(false)
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn refreshable(&self) -> bool {
        true
    }
}

/// Token provider wrapping a fixed token (e.g. from `GITHUB_TOKEN`).
pub struct StaticTokenProvider {
    host: String,
    token: String,
}

impl StaticTokenProvider {
    /// Create a provider that always returns `token`.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
        }
    }

    /// Build a provider from an environment variable, if it is set and non-empty.
    pub fn from_env(host: impl Into<String>, var: &str) -> Option<Self> {
        std::env::var(var)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(|t| Self::new(host, t))
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("host", &self.host)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn host(&self) -> &str {
        &self.host
    }
}
