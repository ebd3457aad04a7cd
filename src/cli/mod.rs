//! cli
//!
//! Command-line interface layer for regsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. Handlers load configuration, build a
//! [`crate::sync::SyncEngine`] and format its results. All remote changes
//! flow through the engine.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::ui::output::Verbosity;
use anyhow::Result;
use std::process::ExitCode;

/// Flags shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub debug: bool,
    pub quiet: bool,
    pub interactive: bool,
    pub json: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let ctx = Context {
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
        json: cli.json,
    };

    if let Err(e) = crate::logging::init(ctx.debug) {
        crate::ui::output::warn(format!("logging unavailable: {e}"), ctx.verbosity());
    }

    commands::dispatch(cli.command, &ctx)
}
