//! cli::commands::unlink
//!
//! Forget the repository binding of a registry.
//!
//! The remote repository is not touched. The binding and its snapshot are
//! removed, so the next export creates a fresh repository.

use super::{build_engine, load_config, parse_registry_id, runtime};
use crate::cli::Context;
use crate::core::types::RegistryId;
use crate::ui::{output, prompts};
use anyhow::{bail, Result};

/// Run the unlink command.
pub fn unlink(ctx: &Context, registry_id: &str, yes: bool) -> Result<()> {
    let id = parse_registry_id(registry_id)?;
    let rt = runtime()?;
    rt.block_on(unlink_async(ctx, &id, yes))
}

async fn unlink_async(ctx: &Context, id: &RegistryId, yes: bool) -> Result<()> {
    let config = load_config()?;
    let engine = build_engine(&config)?;
    let stored = engine.binding(id).await?;

    if !yes {
        if !ctx.interactive {
            bail!("Refusing to unlink without confirmation. Use --yes.");
        }
        let question = format!(
            "Forget that '{}' is published to {}?",
            id, stored.binding.repo
        );
        if !prompts::confirm(&question, false, ctx.interactive)? {
            output::print("Aborted.", ctx.verbosity());
            return Ok(());
        }
    }

    engine.unlink(id).await?;
    output::print(
        format!(
            "Unlinked '{}'. {} was left unchanged.",
            id, stored.binding.repo_url
        ),
        ctx.verbosity(),
    );
    Ok(())
}
