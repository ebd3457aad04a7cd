//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the sync engine to execute the command
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands that talk to GitHub are async. Each one is a synchronous
//! wrapper that builds a tokio runtime and blocks on the async body.

mod auth;
mod completion;
mod config_cmd;
mod diff;
mod export;
mod hosting;
mod push;
mod status;
mod unlink;

pub use auth::{auth, token_provider};
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use diff::diff;
pub use export::export;
pub use hosting::hosting;
pub use push::push;
pub use status::status;
pub use unlink::unlink;

use crate::cli::args::{Command, ConfigAction};
use crate::cli::Context;
use crate::core::config::Config;
use crate::core::paths::DataPaths;
use crate::core::types::RegistryId;
use crate::forge;
use crate::registry::{JsonFileSource, Registry, RegistrySource};
use crate::sync::{FileSnapshotStore, PushOutcome, SyncEngine};
use anyhow::{Context as _, Result};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

/// Exit status of a push refused because the remote moved.
pub const EXIT_CONFLICT: u8 = 2;

/// Exit status for the outcome of a push, including the push that ends an
/// export.
pub(crate) fn exit_status(outcome: &PushOutcome) -> u8 {
    match outcome {
        PushOutcome::Conflict { .. } => EXIT_CONFLICT,
        PushOutcome::Pushed { .. } | PushOutcome::AlreadyUpToDate => 0,
    }
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    match command {
        Command::Auth {
            token,
            status,
            logout,
        } => auth::auth(ctx, token.as_deref(), status, logout).map(|_| ExitCode::SUCCESS),
        Command::Export {
            registry,
            name,
            org,
            private,
            public,
            description,
        } => export::export(
            ctx,
            &export::ExportArgs {
                registry,
                name,
                org,
                private,
                public,
                description,
            },
        ),
        Command::Push {
            registry,
            force,
            allow_empty,
            message,
        } => push::push(ctx, &registry, force, allow_empty, message),
        Command::Status { registry_id } => {
            status::status(ctx, registry_id.as_deref()).map(|_| ExitCode::SUCCESS)
        }
        Command::Diff { registry } => diff::diff(ctx, &registry).map(|_| ExitCode::SUCCESS),
        Command::Hosting { registry_id } => {
            hosting::hosting(ctx, &registry_id).map(|_| ExitCode::SUCCESS)
        }
        Command::Unlink { registry_id, yes } => {
            unlink::unlink(ctx, &registry_id, yes).map(|_| ExitCode::SUCCESS)
        }
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        }
        .map(|_| ExitCode::SUCCESS),
        Command::Completion { shell } => completion::completion(shell).map(|_| ExitCode::SUCCESS),
    }
}

/// Load configuration from the standard locations.
pub(crate) fn load_config() -> Result<Config> {
    Config::load().context("Failed to load configuration")
}

/// Build the sync engine from configuration.
pub(crate) fn build_engine(config: &Config) -> Result<SyncEngine> {
    let data_dir = config.data_dir()?;
    let provider = token_provider(config, &data_dir)?;
    let host = forge::create_host(config.api_base(), config.timeout(), provider)
        .context("Failed to create GitHub client")?;
    let store = FileSnapshotStore::new(DataPaths::new(data_dir));
    Ok(SyncEngine::new(
        host,
        Arc::new(store),
        config.max_concurrent_blobs(),
    ))
}

/// Read a registry export from disk.
pub(crate) async fn load_registry(path: &Path) -> Result<Registry> {
    JsonFileSource::new(path)
        .load()
        .await
        .with_context(|| format!("Failed to load registry from {}", path.display()))
}

pub(crate) fn parse_registry_id(id: &str) -> Result<RegistryId> {
    RegistryId::new(id).with_context(|| format!("Invalid registry id '{}'", id))
}

/// Build a runtime for one async command.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start async runtime")
}
