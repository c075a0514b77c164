// src/error.rs

//! Error types for crate generation and directory reconciliation

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the library
#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Failed to parse {}: {source}", path.display())]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings file: {0}")]
    ConfigError(String),

    #[error("Required parameter '{0}' is missing or not a string")]
    MissingParameter(String),

    #[error("Parameter '{key}' has unsupported type {kind}; expected an integer, string or boolean")]
    UnsupportedValueType { key: String, kind: &'static str },

    #[error("Parameter '{key}' would replace crate entity '{id}'")]
    EntityCollision { key: String, id: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    #[error("Directories already reconciled: {0}")]
    AlreadyReconciled(String),

    #[error("Reconciliation lock is held by another process: {}", .0.display())]
    Locked(PathBuf),

    #[error("Journal error: {0}")]
    Journal(String),
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
