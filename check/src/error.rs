//! Fatal errors that abort a check run.
//!
//! Anything wrong with the data itself is a [`Problem`](engn_core::Problem)
//! in the report instead.

use std::path::PathBuf;

use engn_store::StoreError;

/// Typed error for check runs.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A target path does not exist.
    #[error("Target '{}' not found", .0.display())]
    TargetNotFound(PathBuf),

    /// Filesystem I/O failure while walking targets.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A data file could not be read.
    #[error("cannot read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    /// Project or policy configuration could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Nothing in the run defined a type or enumeration.
    #[error("no schema definitions found")]
    NoSchemaDefinitions,

    /// Invalid request (e.g. no targets, or a checker run twice).
    #[error("{0}")]
    InvalidInput(String),

    /// The scanning thread pool could not be started.
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience alias for results with [`CheckError`].
pub type Result<T> = std::result::Result<T, CheckError>;
