// ── Core error types ──
//
// Errors surfaced by schoolsync-core. Listener tasks never return these
// to a caller; they are converted into store flags and log lines. Only
// the mutation gateway and one-shot reads hand them back.

use thiserror::Error;

/// Failure reported by a [`RemoteStore`](crate::remote::RemoteStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("permission denied on {path}")]
    PermissionDenied { path: String },

    #[error("remote store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("document not found: {path}")]
    NotFound { path: String },

    #[error("write rejected on {path}: {reason}")]
    Rejected { path: String, reason: String },
}

/// Failure reported by a [`LocalCache`](crate::cache::LocalCache).
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache snapshot could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid cache key '{key}'")]
    InvalidKey { key: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Data errors ──────────────────────────────────────────────────
    #[error("Entity not found: {entity_type} with id {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Write errors ─────────────────────────────────────────────────
    /// The remote store refused a write; the local change was rolled back.
    #[error("Write rejected, local change rolled back: {source}")]
    WriteRejected {
        #[source]
        source: RemoteError,
    },

    // ── Boundary errors ──────────────────────────────────────────────
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Local cache error: {0}")]
    Cache(#[from] CacheError),

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Session has not been started")]
    SessionNotStarted,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// `true` when the error came from a rolled-back optimistic write.
    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::WriteRejected { .. })
    }
}
