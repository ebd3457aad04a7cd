//! cli::commands::status
//!
//! Compare the last push with the remote branch. Never writes.

use super::{build_engine, load_config, parse_registry_id, runtime};
use crate::cli::Context;
use crate::core::types::RegistryId;
use crate::sync::{StatusAdvice, SyncEngine, SyncStatus};
use crate::ui::output;
use anyhow::Result;
use serde::Serialize;

#[derive(Serialize)]
struct StatusReport {
    registry_id: RegistryId,
    repository: String,
    #[serde(flatten)]
    status: SyncStatus,
    advice: StatusAdvice,
}

/// Run the status command.
pub fn status(ctx: &Context, registry_id: Option<&str>) -> Result<()> {
    let rt = runtime()?;
    rt.block_on(status_async(ctx, registry_id))
}

async fn status_async(ctx: &Context, registry_id: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let engine = build_engine(&config)?;

    let ids = match registry_id {
        Some(id) => vec![parse_registry_id(id)?],
        None => engine.bindings().await?,
    };

    let mut reports = Vec::with_capacity(ids.len());
    for id in ids {
        reports.push(report_for(&engine, id).await?);
    }

    if ctx.json {
        return match (registry_id, reports.as_slice()) {
            (Some(_), [single]) => output::json(single),
            _ => output::json(&reports),
        };
    }

    if reports.is_empty() {
        output::print("No registries have been exported.", ctx.verbosity());
    }
    for report in &reports {
        print_report(ctx, report);
    }
    Ok(())
}

async fn report_for(engine: &SyncEngine, id: RegistryId) -> Result<StatusReport> {
    let stored = engine.binding(&id).await?;
    let status = engine.status(&id).await?;
    Ok(StatusReport {
        registry_id: id,
        repository: stored.binding.repo.to_string(),
        advice: status.advice(),
        status,
    })
}

fn print_report(ctx: &Context, report: &StatusReport) {
    let verbosity = ctx.verbosity();
    let status = &report.status;
    output::print(
        format!("{} -> {}", report.registry_id, report.repository),
        verbosity,
    );
    output::print(
        format!(
            "  last pushed: {}{}",
            output::format_optional_commit(status.local_commit.as_ref()),
            status
                .last_synced_at
                .map(|at| format!(" at {}", at.format("%Y-%m-%d %H:%M UTC")))
                .unwrap_or_default()
        ),
        verbosity,
    );
    output::print(
        format!(
            "  remote head: {}",
            output::format_optional_commit(status.remote_commit.as_ref())
        ),
        verbosity,
    );
    let advice = match report.advice {
        StatusAdvice::InSync => "  up to date with the remote",
        StatusAdvice::NeverPushed => "  not pushed yet; run 'regsync push'",
        StatusAdvice::RemoteMissing => {
            "  remote branch is gone; 'regsync push' recreates it"
        }
        StatusAdvice::RemoteAhead => {
            "  remote has changes not made here; pull is not supported, 'regsync push --force' overwrites them"
        }
    };
    output::print(advice, verbosity);
}
