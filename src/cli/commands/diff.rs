//! diff command - Show what a push would change

use super::{build_engine, load_config, load_registry, runtime};
use crate::cli::Context;
use crate::ui::output;
use anyhow::Result;
use std::path::Path;

/// Run the diff command.
///
/// Compares against the local snapshot only; no request is sent.
pub fn diff(ctx: &Context, registry: &Path) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(diff_async(ctx, registry))
}

async fn diff_async(ctx: &Context, registry: &Path) -> Result<()> {
    let config = load_config()?;
    let engine = build_engine(&config)?;
    let registry = load_registry(registry).await?;
    let desired = engine.desired_for(&registry).await?;
    let changes = engine.plan(&registry.id, &desired).await?;

    if ctx.json {
        return output::json(&changes);
    }
    if changes.is_empty() {
        output::print("Nothing to push", ctx.verbosity());
    } else {
        println!("{}", output::format_changeset(&changes));
        output::print(format!("\n{}", changes.summary()), ctx.verbosity());
    }
    Ok(())
}
