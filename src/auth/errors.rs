//! auth::errors
//!
//! Authentication error types.
//!
//! # Design
//!
//! Error messages never contain token values. They carry enough context
//! (host, store failure) to tell the operator what to fix.
//!
//! # Example
//!
//! ```
//! use regsync::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated("github.com".to_string());
//! assert!(err.to_string().contains("github.com"));
//! assert!(!err.to_string().contains("ghp_"));
//! ```

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors from authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token is stored or configured for the host.
    #[error("not authenticated for host '{0}'. Run 'regsync auth' or set GITHUB_TOKEN.")]
    NotAuthenticated(String),

    /// The stored token is unusable.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Error from secret storage.
    #[error("secret store error: {0}")]
    SecretStore(String),
}

impl From<SecretError> for AuthError {
    fn from(err: SecretError) -> Self {
        AuthError::SecretStore(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authenticated_mentions_remedy() {
        let msg = AuthError::NotAuthenticated("github.com".into()).to_string();
        assert!(msg.contains("regsync auth"));
        assert!(msg.contains("GITHUB_TOKEN"));
    }

    #[test]
    fn converts_secret_errors() {
        let err: AuthError = SecretError::ReadError("disk".into()).into();
        assert!(matches!(err, AuthError::SecretStore(msg) if msg.contains("disk")));
    }
}
