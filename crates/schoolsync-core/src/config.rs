// ── Runtime sync configuration ──
//
// Tuning for a sync session. Core never reads config files; the CLI (or
// any embedding app) builds a `SyncConfig` and hands it in.

use std::time::Duration;

/// Fee total assumed for a student with no fee document.
pub const DEFAULT_TOTAL_FEE: i64 = 50_000;

/// Prefix for every cache key written by the listener manager.
pub const DEFAULT_CACHE_KEY_PREFIX: &str = "cache:";

/// Configuration for one [`SyncSession`](crate::SyncSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Total used when a student has no fee document (currency units).
    pub default_total_fee: i64,
    /// Read cache placeholders and write cache snapshots.
    pub cache_enabled: bool,
    /// Prepended to every collection's cache key.
    pub cache_key_prefix: String,
    /// Log a warning if the fee engine is still waiting for one of its
    /// two inputs after this long. Zero disables the warning.
    pub fee_ready_warn_after: Duration,
}

impl SyncConfig {
    /// Cache key for a listener keyed by `selector_key`.
    pub fn cache_key(&self, selector_key: &str) -> String {
        format!("{}{selector_key}", self.cache_key_prefix)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            default_total_fee: DEFAULT_TOTAL_FEE,
            cache_enabled: true,
            cache_key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_owned(),
            fee_ready_warn_after: Duration::from_secs(10),
        }
    }
}
