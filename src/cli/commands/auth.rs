//! cli::commands::auth
//!
//! Authentication command for storing the GitHub token.
//!
//! # Design
//!
//! The auth command:
//! - Stores tokens via the configured SecretStore
//! - NEVER prints tokens to stdout/stderr
//! - Supports both interactive and non-interactive modes
//!
//! # Example
//!
//! ```bash
//! # Interactive (prompts for token)
//! regsync auth
//!
//! # Non-interactive
//! regsync auth --token ghp_xxxx
//!
//! # Check status
//! regsync auth --status
//!
//! # Remove stored token
//! regsync auth --logout
//! ```

use super::load_config;
use crate::auth::{StaticTokenProvider, StoredTokenProvider, TokenProvider, GITHUB_TOKEN_KEY};
use crate::cli::Context;
use crate::core::config::Config;
use crate::forge::host_label;
use crate::secrets::{self, SecretStore};
use crate::ui::{output, prompts};
use anyhow::{bail, Context as _, Result};
use std::path::Path;
use std::sync::Arc;

/// Environment variable that overrides the stored token.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Run the auth command.
///
/// # Security
///
/// This function NEVER prints the token value. It only confirms success/failure.
pub fn auth(ctx: &Context, token: Option<&str>, status: bool, logout: bool) -> Result<()> {
    let config = load_config()?;
    let host = host_label(config.api_base());
    let store = open_store(&config)?;

    if status {
        return show_status(store.as_ref(), &host, ctx);
    }

    if logout {
        return do_logout(store.as_ref(), &host, ctx);
    }

    let token_value = get_token(ctx, token)?;
    validate_token(&token_value)?;

    store
        .set(GITHUB_TOKEN_KEY, &token_value)
        .context("Failed to store token")?;

    output::print(
        format!("Authentication configured for {}.", host),
        ctx.verbosity(),
    );
    Ok(())
}

/// Token provider for host requests.
///
/// `GITHUB_TOKEN` wins over the stored token.
pub fn token_provider(config: &Config, data_dir: &Path) -> Result<Arc<dyn TokenProvider>> {
    let host = host_label(config.api_base());
    if let Some(provider) = StaticTokenProvider::from_env(host.as_str(), TOKEN_ENV_VAR) {
        return Ok(Arc::new(provider));
    }
    let store = secrets::create_store(config.secrets_provider(), data_dir)
        .context("Failed to initialize secret store")?;
    Ok(Arc::new(StoredTokenProvider::new(host, store)))
}

fn open_store(config: &Config) -> Result<Box<dyn SecretStore>> {
    let data_dir = config.data_dir()?;
    secrets::create_store(config.secrets_provider(), &data_dir)
        .context("Failed to initialize secret store")
}

/// Show authentication status.
fn show_status(store: &dyn SecretStore, host: &str, ctx: &Context) -> Result<()> {
    let exists = store.exists(GITHUB_TOKEN_KEY)?;
    let from_env = std::env::var(TOKEN_ENV_VAR).is_ok_and(|t| !t.is_empty());

    if ctx.quiet {
        // Machine-readable output
        if exists || from_env {
            println!("authenticated");
        } else {
            println!("not_authenticated");
        }
    } else if from_env {
        println!("Using {} for {}.", TOKEN_ENV_VAR, host);
    } else if exists {
        println!("Authenticated with {}.", host);
    } else {
        println!("Not authenticated with {}.", host);
        println!("Run 'regsync auth' to authenticate.");
    }

    Ok(())
}

/// Remove stored authentication.
fn do_logout(store: &dyn SecretStore, host: &str, ctx: &Context) -> Result<()> {
    store
        .delete(GITHUB_TOKEN_KEY)
        .context("Failed to remove stored token")?;

    output::print(format!("Logged out from {}.", host), ctx.verbosity());
    Ok(())
}

/// Get token from argument or interactive prompt.
fn get_token(ctx: &Context, token_arg: Option<&str>) -> Result<String> {
    if let Some(t) = token_arg {
        return Ok(t.to_string());
    }

    if !ctx.interactive {
        bail!("Token required. Use --token <TOKEN> or run interactively.");
    }

    let token = prompts::password("GitHub Personal Access Token: ", ctx.interactive)
        .context("Failed to read token")?;
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }
    Ok(token)
}

/// Validate token format (basic checks).
///
/// The token is not checked against the API here.
fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }

    if token.len() < 10 {
        bail!("Token appears to be too short.");
    }

    if token.contains(' ') {
        bail!("Token should not contain spaces.");
    }

    if token.contains('\n') || token.contains('\r') {
        bail!("Token should not contain newlines.");
    }

    Ok(())
}
