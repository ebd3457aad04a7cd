//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag.
//! When `--json` is enabled, output is machine-readable JSON on stdout.

use serde::Serialize;
use std::fmt::Display;

use crate::core::types::ObjectId;
use crate::sync::Changeset;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a suggested next step (respects quiet mode).
pub fn hint(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("{}", hint_line(message));
    }
}

fn hint_line(message: impl Display) -> String {
    format!("hint: {}", message)
}

/// Print a value as pretty JSON (always shown).
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Abbreviated commit id for display.
pub fn format_commit(commit: &ObjectId) -> &str {
    commit.short(7)
}

/// Optional commit for display.
pub fn format_optional_commit(commit: Option<&ObjectId>) -> String {
    commit
        .map(|c| format_commit(c).to_string())
        .unwrap_or_else(|| "(none)".to_string())
}

/// One line per changed path, prefixed `A`, `M` or `D`.
pub fn format_changeset(changes: &Changeset) -> String {
    let lines: Vec<String> = changes
        .added
        .iter()
        .map(|p| format!("A  {}", p))
        .chain(changes.modified.iter().map(|p| format!("M  {}", p)))
        .chain(changes.deleted.iter().map(|p| format!("D  {}", p)))
        .collect();
    lines.join("\n")
}
