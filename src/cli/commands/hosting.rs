//! hosting command - Refresh the published site URL

use super::{build_engine, load_config, parse_registry_id, runtime};
use crate::cli::Context;
use crate::core::types::RegistryId;
use crate::ui::output;
use anyhow::Result;

/// Run the hosting command.
pub fn hosting(ctx: &Context, registry_id: &str) -> Result<()> {
    let id = parse_registry_id(registry_id)?;
    let rt = runtime()?;
    rt.block_on(hosting_async(ctx, &id))
}

async fn hosting_async(ctx: &Context, id: &RegistryId) -> Result<()> {
    let config = load_config()?;
    let engine = build_engine(&config)?;
    let url = engine.refresh_hosting_url(id).await?;
    if ctx.json {
        return output::json(&serde_json::json!({ "hosting_url": url }));
    }
    output::print(url, ctx.verbosity());
    Ok(())
}
