//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A persisted snapshot failed its integrity check or could not be decoded.
    #[error("snapshot for {key} is corrupt: {reason}")]
    SnapshotCorrupt {
        /// The scene key the snapshot was stored under.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No scene definition matches the requested key.
    #[error("unknown scene: {0}")]
    UnknownScene(String),

    /// A scene definition failed validation.
    #[error("invalid scene definition: {0}")]
    InvalidDefinition(String),

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
