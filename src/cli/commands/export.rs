//! cli::commands::export
//!
//! Create the repository for a registry and publish it for the first time.

use super::{build_engine, exit_status, load_config, load_registry, runtime};
use crate::cli::Context;
use crate::forge::{ForgeError, Visibility};
use crate::sync::{ExportOptions, PushOutcome, SyncError};
use crate::ui::output;
use anyhow::{bail, Result};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Arguments of the export command.
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub registry: PathBuf,
    pub name: String,
    pub org: Option<String>,
    pub private: bool,
    pub public: bool,
    pub description: Option<String>,
}

#[derive(Serialize)]
struct ExportReport<'a> {
    repository: String,
    repo_url: &'a str,
    hosting_url: Option<&'a str>,
    push: &'a PushOutcome,
}

/// Run the export command.
pub fn export(ctx: &Context, args: &ExportArgs) -> Result<ExitCode> {
    let rt = runtime()?;
    rt.block_on(export_async(ctx, args))
}

async fn export_async(ctx: &Context, args: &ExportArgs) -> Result<ExitCode> {
    let config = load_config()?;
    let engine = build_engine(&config)?;
    let registry = load_registry(&args.registry).await?;

    let visibility = if args.private {
        Visibility::Private
    } else if args.public {
        Visibility::Public
    } else {
        config.export_visibility()
    };
    let options = ExportOptions {
        repo_name: args.name.clone(),
        org: args
            .org
            .clone()
            .or_else(|| config.export_org().map(str::to_string)),
        visibility,
        description: args.description.clone(),
    };

    let outcome = match engine.export(&registry, &options).await {
        Ok(outcome) => outcome,
        Err(SyncError::Forge(ForgeError::NameCollision(name))) => {
            bail!(
                "A repository named '{}' already exists. Choose another name with --name.",
                name
            )
        }
        Err(SyncError::AlreadyExported { repo, .. }) => {
            bail!(
                "Registry '{}' is already published to {}. Use 'regsync push' to publish changes.",
                registry.id,
                repo
            )
        }
        Err(e) => return Err(e.into()),
    };

    let status = ExitCode::from(exit_status(&outcome.push));
    let binding = &outcome.binding;
    if ctx.json {
        output::json(&ExportReport {
            repository: binding.repo.to_string(),
            repo_url: &binding.repo_url,
            hosting_url: binding.hosting_url.as_deref(),
            push: &outcome.push,
        })?;
        return Ok(status);
    }

    let verbosity = ctx.verbosity();
    output::print(format!("Repository: {}", binding.repo_url), verbosity);
    if let Some(url) = &binding.hosting_url {
        output::print(format!("Site:       {}", url), verbosity);
    }
    match &outcome.push {
        PushOutcome::Pushed { commit, changes } => output::print(
            format!(
                "Pushed {} ({})",
                output::format_commit(commit),
                changes
            ),
            verbosity,
        ),
        PushOutcome::AlreadyUpToDate => output::print("Nothing to push", verbosity),
        PushOutcome::Conflict { .. } => output::warn(
            "the branch changed during export; run 'regsync push --force' to publish",
            verbosity,
        ),
    }
    Ok(status)
}
