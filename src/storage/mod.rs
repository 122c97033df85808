//! Persistence for trained models and the training ledger
//!
//! - `model_store`: paired model/scaler JSON files with per-name locking
//! - `training_history`: sled ledger of completed training runs

pub mod model_store;
pub mod training_history;

pub use model_store::{ModelArtifact, ModelStore};
pub use training_history::TrainingHistory;

/// Storage error types
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Model and scaler files on disk come from different training runs.
    #[error("Model '{name}' has mismatched artifacts (model {model_id}, scaler {scaler_id})")]
    PairMismatch {
        name: String,
        model_id: String,
        scaler_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
}
