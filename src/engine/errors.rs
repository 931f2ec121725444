use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors surfaced by the storage layer and the segment cache.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("permission denied at {path}: {source}")]
    Permission { path: PathBuf, source: io::Error },

    #[error("disk full while writing {path}")]
    DiskFull { path: PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Classify an I/O error against the path it occurred on.
    /// Permission and no-space failures are distinct kinds by contract.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => StorageError::Permission {
                path: path.to_path_buf(),
                source: err,
            },
            io::ErrorKind::StorageFull => StorageError::DiskFull {
                path: path.to_path_buf(),
            },
            _ if err.raw_os_error() == Some(28) => StorageError::DiskFull {
                path: path.to_path_buf(),
            },
            _ => StorageError::Io(err),
        }
    }
}

/// Errors surfaced by the context manager.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("no task specified and no current task set")]
    NoCurrentTask,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}
