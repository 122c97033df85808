//! Error kinds returned by every public model operation.

use std::time::Duration;

use thiserror::Error;

use crate::storage::StorageError;

use super::optimization::RangeError;
use super::process::FeatureVectorError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No complete artifact pair is stored under this name.
    #[error("Model '{0}' not found. Please train the model first.")]
    ModelNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient training data: {0}")]
    InsufficientData(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Startup initialization has not finished (or failed).
    #[error("Service not ready: {0}")]
    NotReady(String),

    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Stable machine-readable code used in failure responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ModelNotFound(_) => "MODEL_NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotReady(_) => "NOT_READY",
            Self::DeadlineExceeded(_) => "DEADLINE_EXCEEDED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the message may be shown to the caller verbatim.
    ///
    /// Storage and internal errors carry paths and library messages; callers
    /// get a generic message and the details go to the log.
    pub const fn is_caller_facing(&self) -> bool {
        !matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

impl From<FeatureVectorError> for ServiceError {
    fn from(err: FeatureVectorError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<RangeError> for ServiceError {
    fn from(err: RangeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("worker task failed: {err}"))
    }
}
