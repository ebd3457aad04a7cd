//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`prompts`] - Interactive confirmations
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All user-facing text goes through this module so quiet, JSON and
//! non-interactive modes are handled in one place. Diagnostics go through
//! `tracing` instead.

pub mod output;
pub mod prompts;
