use serde_json::{Value, json};
use thiserror::Error;

use crate::engine::errors::{ContextError, StorageError};

/// Tool-level failures, each carrying a stable wire code.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ConfirmationRequired(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::InvalidParameter(_) => "INVALID_PARAMETER",
            ToolError::NotFound(_) => "NOT_FOUND",
            ToolError::ConfirmationRequired(_) => "CONFIRMATION_REQUIRED",
            ToolError::Conflict(_) => "CONFLICT",
            ToolError::Storage(StorageError::Permission { .. }) => "IO_PERMISSION",
            ToolError::Storage(StorageError::DiskFull { .. }) => "DISK_FULL",
            ToolError::Storage(_) => "INTERNAL_ERROR",
            ToolError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The standard error envelope returned to callers.
    pub fn to_response(&self) -> Value {
        json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
                "details": {},
            }
        })
    }
}

impl From<ContextError> for ToolError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::InvalidParameter(message) => ToolError::InvalidParameter(message),
            ContextError::NotFound(message) => ToolError::NotFound(message),
            ContextError::NoCurrentTask => ToolError::InvalidParameter(err.to_string()),
            ContextError::Storage(storage) => ToolError::Storage(storage),
        }
    }
}
