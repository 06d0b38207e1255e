//! CLI error types with miette diagnostics.
//!
//! Maps library errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use schoolsync_config::ConfigError;
use schoolsync_core::CacheError;

/// Process exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(schoolsync::not_found),
        help("Run: schoolsync {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(
        code(schoolsync::conflict),
        help("Pass --force to overwrite it.")
    )]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(schoolsync::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(schoolsync::config),
        help("Check the config file (schoolsync config path) and SCHOOLSYNC_* variables.")
    )]
    Config(#[from] ConfigError),

    // ── Cache ────────────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(schoolsync::cache),
        help("The cache is rebuilt by the client on its next live snapshot; clearing it is safe.")
    )]
    Cache(#[from] CacheError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(schoolsync::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let not_found = CliError::NotFound {
            resource_type: "collection".into(),
            identifier: "students".into(),
            list_command: "cache list".into(),
        };
        assert_eq!(not_found.exit_code(), exit_code::NOT_FOUND);

        let invalid = CliError::Config(ConfigError::Validation {
            field: "sync.default_total_fee".into(),
            reason: "must not be negative".into(),
        });
        assert_eq!(invalid.exit_code(), exit_code::USAGE);

        let io = CliError::Io(std::io::Error::other("disk gone"));
        assert_eq!(io.exit_code(), exit_code::GENERAL);
        assert_ne!(io.exit_code(), exit_code::SUCCESS);
    }
}
