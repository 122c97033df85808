//! yieldcast: Reaction Yield Prediction
//!
//! Trains a random forest on synthetic process data and answers yield
//! predictions and parameter optimizations from the stored model.
//!
//! ## Architecture
//!
//! - **ML Engine**: Sample generation, scaling, random forest, grid search
//! - **Storage**: Paired model/scaler artifacts and the training ledger
//! - **Service**: Readiness gate, blocking-pool offload, caller deadlines
//! - **API**: Axum routes with a uniform success/failure envelope

pub mod config;
pub mod types;
pub mod ml_engine;
pub mod storage;
pub mod service;
pub mod api;

// Re-export configuration
pub use config::ServiceConfig;

// Re-export commonly used types
pub use types::{
    FeatureVector, OptimizationRequest, OptimizationResult, Parameter, ParameterRange,
    ParameterValues, Prediction, ServiceError, TrainReport, TrainingSet,
};

// Re-export storage
pub use storage::{ModelArtifact, ModelStore, StorageError, TrainingHistory};

// Re-export the service façade
pub use service::{OptimizeOptions, Readiness, TrainOptions, YieldService};
