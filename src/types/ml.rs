//! Training and prediction outputs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::process::ParameterValues;

/// Summary of one completed training run.
///
/// Returned by the train operation and appended to the training history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub model_name: String,
    /// Identifier shared by the persisted model and scaler of this run
    pub training_id: String,
    pub trained_at: DateTime<Utc>,
    /// Held-out coefficient of determination (may be negative)
    pub score: f64,
    pub train_samples: usize,
    pub test_samples: usize,
    pub tree_count: usize,
    /// Seed used for the synthetic training data
    pub data_seed: u64,
}

/// Point prediction with the model's feature importances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: f64,
    pub feature_importance: ParameterValues,
}
