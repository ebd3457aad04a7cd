//! cli::commands::push
//!
//! Publish registry changes to the bound repository.
//!
//! # Exit Status
//!
//! - 0: pushed, or nothing to push
//! - 1: error
//! - 2: the remote branch moved since the last push

use super::{build_engine, exit_status, load_config, load_registry, runtime};
use crate::cli::Context;
use crate::sync::{PushOptions, PushOutcome, SyncError};
use crate::ui::{output, prompts};
use anyhow::Result;
use std::path::Path;
use std::process::ExitCode;

/// Run the push command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn push(
    ctx: &Context,
    registry: &Path,
    force: bool,
    allow_empty: bool,
    message: Option<String>,
) -> Result<ExitCode> {
    let rt = runtime()?;
    rt.block_on(push_async(
        ctx,
        registry,
        PushOptions {
            force,
            allow_empty,
            message,
        },
    ))
}

async fn push_async(ctx: &Context, path: &Path, mut options: PushOptions) -> Result<ExitCode> {
    let config = load_config()?;
    let engine = build_engine(&config)?;
    let registry = load_registry(path).await?;
    let desired = engine.desired_for(&registry).await?;

    let outcome = match engine.push(&registry.id, &desired, &options).await {
        Err(SyncError::EmptyDesiredSet { published, .. }) if ctx.interactive => {
            let question = format!("This removes all {} published files. Continue?", published);
            if !prompts::confirm(&question, false, ctx.interactive)? {
                output::print("Aborted.", ctx.verbosity());
                return Ok(ExitCode::SUCCESS);
            }
            options.allow_empty = true;
            engine.push(&registry.id, &desired, &options).await?
        }
        other => other?,
    };

    report(ctx, &outcome)?;
    Ok(ExitCode::from(exit_status(&outcome)))
}

fn report(ctx: &Context, outcome: &PushOutcome) -> Result<()> {
    if ctx.json {
        return output::json(outcome);
    }
    match outcome {
        PushOutcome::Pushed { commit, changes } => output::print(
            format!("Pushed {} ({})", output::format_commit(commit), changes),
            ctx.verbosity(),
        ),
        PushOutcome::AlreadyUpToDate => output::print("Nothing to push", ctx.verbosity()),
        PushOutcome::Conflict { local, remote } => {
            output::error(format!(
                "the remote branch changed since the last push (last pushed {}, remote is at {})",
                output::format_optional_commit(local.as_ref()),
                output::format_optional_commit(remote.as_ref()),
            ));
            output::hint(
                "pull is not supported; rerun with --force to overwrite the remote changes",
                ctx.verbosity(),
            );
        }
    }
    Ok(())
}
