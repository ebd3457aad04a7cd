//! config command - Get, set, or list configuration values

use super::load_config;
use crate::cli::Context;
use crate::core::config::KEYS;
use crate::ui::output;
use anyhow::{Context as _, Result};

/// Get a configuration value.
///
/// Unset keys print nothing.
pub fn get(_ctx: &Context, key: &str) -> Result<()> {
    let config = load_config()?;
    if let Some(value) = config.global.get(key)? {
        println!("{}", value);
    }
    Ok(())
}

/// Set a configuration value.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = load_config()?;
    config.global.set(key, value)?;
    let path = config.save().context("Failed to write config")?;

    output::print(
        format!("Set {} = {} in {}", key, value, path.display()),
        ctx.verbosity(),
    );
    Ok(())
}

/// List all configuration values.
pub fn list(_ctx: &Context) -> Result<()> {
    let config = load_config()?;

    match config.loaded_from() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config file; defaults)"),
    }
    for key in KEYS {
        match config.global.get(key)? {
            Some(value) => println!("{} = {}", key, value),
            None => println!("{} = (not set)", key),
        }
    }
    Ok(())
}
