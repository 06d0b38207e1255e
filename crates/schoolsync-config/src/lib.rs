//! Shared configuration for schoolsync tools.
//!
//! TOML file + `SCHOOLSYNC_*` environment overrides, platform directories,
//! and translation to `schoolsync_core::SyncConfig`. Core never reads files;
//! binaries load a [`Config`] here and hand the converted value in.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schoolsync_core::SyncConfig;
use schoolsync_core::config::{DEFAULT_CACHE_KEY_PREFIX, DEFAULT_TOTAL_FEE};

/// Environment prefix. Nested keys are separated by a double underscore,
/// e.g. `SCHOOLSYNC_SYNC__DEFAULT_TOTAL_FEE=40000`.
pub const ENV_PREFIX: &str = "SCHOOLSYNC_";

const OUTPUT_FORMATS: &[&str] = &["table", "json", "plain"];

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub cache: CacheSettings,
}

/// Presentation defaults for the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}

/// Mirrors `SyncConfig`, in file-friendly units.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SyncSettings {
    /// Fee total assumed for students without a fee document.
    #[serde(default = "default_total_fee")]
    pub default_total_fee: i64,

    #[serde(default = "default_true")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_key_prefix")]
    pub cache_key_prefix: String,

    /// Seconds before warning that the fee view is still waiting. 0 = never.
    #[serde(default = "default_fee_ready_warn_after_secs")]
    pub fee_ready_warn_after_secs: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_total_fee: default_total_fee(),
            cache_enabled: default_true(),
            cache_key_prefix: default_cache_key_prefix(),
            fee_ready_warn_after_secs: default_fee_ready_warn_after_secs(),
        }
    }
}

fn default_total_fee() -> i64 {
    DEFAULT_TOTAL_FEE
}
fn default_true() -> bool {
    true
}
fn default_cache_key_prefix() -> String {
    DEFAULT_CACHE_KEY_PREFIX.into()
}
fn default_fee_ready_warn_after_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Override the platform cache directory.
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Reject values the sync layer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.default_total_fee < 0 {
            return Err(ConfigError::Validation {
                field: "sync.default_total_fee".into(),
                reason: format!("must not be negative, got {}", self.sync.default_total_fee),
            });
        }
        if self.sync.cache_enabled && self.sync.cache_key_prefix.is_empty() {
            return Err(ConfigError::Validation {
                field: "sync.cache_key_prefix".into(),
                reason: "must not be empty while the cache is enabled".into(),
            });
        }
        if !OUTPUT_FORMATS.contains(&self.defaults.output.as_str()) {
            return Err(ConfigError::Validation {
                field: "defaults.output".into(),
                reason: format!(
                    "expected one of {}, got '{}'",
                    OUTPUT_FORMATS.join(", "),
                    self.defaults.output
                ),
            });
        }
        Ok(())
    }

    /// Build the core runtime config.
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            default_total_fee: self.sync.default_total_fee,
            cache_enabled: self.sync.cache_enabled,
            cache_key_prefix: self.sync.cache_key_prefix.clone(),
            fee_ready_warn_after: Duration::from_secs(self.sync.fee_ready_warn_after_secs),
        }
    }

    /// Configured cache directory, or the platform default.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache.dir.clone().unwrap_or_else(default_cache_dir)
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "schoolsync", "schoolsync")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".config").join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Platform cache directory for cached collection snapshots.
pub fn default_cache_dir() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback(".cache"),
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}

fn dirs_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("schoolsync");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load and validate the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load and validate Config from `path` + environment. A missing file is
/// not an error; defaults apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load config, returning a default if loading or validation fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    cfg.validate()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.sync, SyncSettings::default());
        assert_eq!(cfg.to_sync_config(), SyncConfig::default());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[sync]\ndefault_total_fee = 42000\nfee_ready_warn_after_secs = 0\n\n\
             [cache]\ndir = \"/var/cache/school\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        let sync = cfg.to_sync_config();
        assert_eq!(sync.default_total_fee, 42_000);
        assert!(sync.fee_ready_warn_after.is_zero());
        assert!(sync.cache_enabled);
        assert_eq!(cfg.cache_dir(), PathBuf::from("/var/cache/school"));
    }

    #[test]
    fn negative_fee_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sync]\ndefault_total_fee = -1\n").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn unknown_output_format_is_rejected() {
        let cfg = Config {
            defaults: Defaults {
                output: "yaml".into(),
            },
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.sync.cache_enabled = false;
        cfg.defaults.output = "json".into();

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn default_cache_dir_is_not_empty() {
        assert!(!default_cache_dir().as_os_str().is_empty());
    }
}
