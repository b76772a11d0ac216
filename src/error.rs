//! Error types
//!
//! Only `ConfigError` ever reaches a caller of the Director. Collaborator
//! failures are absorbed into a PASS-with-diagnostic evaluation.

use thiserror::Error;

/// Beat policy / config loading failure. Fatal at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid policy: {0}")]
    Invalid(String),
}

/// Failure of an external collaborator (LLM scorer, fact-checker).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("timed out")]
    Timeout,
}

/// Checkpoint restore failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("checkpoint digest mismatch (expected {expected}, computed {computed})")]
    DigestMismatch { expected: String, computed: String },
}
