//! ML Engine for Reaction Yield Prediction
//!
//! Trains a random forest on synthetic process data and serves predictions
//! and grid-search optimization from the stored model.
//!
//! ## Training path
//! `sample_generator` → `scaler` → `forest` (built from `tree`) → scored by
//! `metrics`, orchestrated by `trainer`.
//!
//! ## Serving path
//! `ModelStore` → `scaler` + `forest` → `predictor` or `optimizer`.
//!
//! ## Architecture
//! - `sample_generator`: Seeded uniform samples labeled by the yield function
//! - `scaler`: Per-feature standardization with zero-variance handling
//! - `tree`: Variance-reduction regression tree in a flat node arena
//! - `forest`: Bootstrap ensemble, trees fitted in parallel (rayon)
//! - `metrics`: Seeded train/test split and R²
//! - `trainer`: End-to-end fit and held-out scoring
//! - `predictor`: Single-point prediction with feature importances
//! - `optimizer`: Exhaustive grid search over parameter ranges

pub mod sample_generator;
pub mod scaler;
pub mod tree;
pub mod forest;
pub mod metrics;
pub mod trainer;
pub mod predictor;
pub mod optimizer;

// Re-export public types
pub use forest::RandomForest;
pub use scaler::ScalerState;
pub use trainer::TrainedModel;
