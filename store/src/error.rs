//! Error types for record store operations.
//!
//! These are failures of the store itself (I/O, serialization). A line that
//! is not a JSON object is not a store error: [`RecordStore::read`] returns
//! it as [`Line::Invalid`] so callers can report it and carry on.
//!
//! [`RecordStore::read`]: crate::RecordStore::read
//! [`Line::Invalid`]: crate::Line::Invalid

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization failure, or a strict read that met an invalid line.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A line that had to be a well-formed record was not.
    #[error("{}:{line}: {message}", .path.display())]
    InvalidLine {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// No standard module has this name.
    #[error("unknown standard module '{0}'")]
    UnknownModule(String),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
