//! logging
//!
//! Tracing subscriber for the binary.
//!
//! Events go to stderr so stdout stays clean for command output and
//! `--json`. The level comes from `RUST_LOG`, defaulting to `warn`;
//! `--debug` raises this crate to `debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init(debug: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = if debug {
        EnvFilter::try_new("warn,regsync=debug")?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn"))?
    };

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(debug)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
