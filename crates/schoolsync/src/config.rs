//! CLI configuration: a thin wrapper around `schoolsync_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--cache-dir).

use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use schoolsync_config::{Config, config_path, load_config, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Load the config file and environment. Invalid config is an error here;
/// the CLI should say so rather than silently fall back.
pub fn load() -> Result<Config, CliError> {
    Ok(load_config()?)
}

/// Cache directory: flag (or `SCHOOLSYNC_CACHE_DIR`) > config > platform default.
pub fn resolve_cache_dir(global: &GlobalOpts, config: &Config) -> PathBuf {
    global
        .cache_dir
        .clone()
        .unwrap_or_else(|| config.cache_dir())
}
