//! System-wide default constants.
//!
//! Centralises the reference values of the training and optimization
//! pipeline. `ServiceConfig::default()` is built from these.

// ============================================================================
// Server
// ============================================================================

/// HTTP bind address.
pub const SERVER_ADDR: &str = "0.0.0.0:5001";

// ============================================================================
// Storage
// ============================================================================

/// Directory holding model and scaler artifacts.
pub const MODELS_DIR: &str = "models";

/// Name of the model trained at startup and used by the HTTP endpoints.
pub const DEFAULT_MODEL_NAME: &str = "yield_model";

/// Sled database recording completed training runs.
pub const HISTORY_DB_PATH: &str = "models/training_history.db";

/// Longest accepted model name.
pub const MAX_MODEL_NAME_LEN: usize = 64;

// ============================================================================
// Training
// ============================================================================

/// Seed for synthetic sample generation.
pub const DATA_SEED: u64 = 42;

/// Number of synthetic samples per training run.
pub const SAMPLE_COUNT: usize = 100;

/// Fraction of samples held out for R² scoring.
pub const TEST_FRACTION: f64 = 0.2;

/// Shuffle seed for the train/test split.
pub const SPLIT_SEED: u64 = 42;

/// Default deadline for a training call (seconds).
pub const TRAIN_TIMEOUT_SECS: u64 = 120;

/// Upper bound on synthetic samples a caller may request.
pub const MAX_SAMPLE_COUNT: usize = 100_000;

/// Default and upper bound for `GET /api/ml/history?limit=`.
pub const HISTORY_LIMIT: usize = 20;
pub const MAX_HISTORY_LIMIT: usize = 500;

// ============================================================================
// Forest
// ============================================================================

/// Trees per forest.
pub const TREE_COUNT: usize = 100;

/// Master seed for bootstrap resampling and feature subsets.
pub const FOREST_SEED: u64 = 42;

/// Minimum samples a node needs before it may split.
pub const MIN_SAMPLES_SPLIT: usize = 2;

/// Minimum samples on each side of a split.
pub const MIN_SAMPLES_LEAF: usize = 1;

// ============================================================================
// Optimizer
// ============================================================================

/// Grid points per parameter (10⁴ candidates).
pub const GRID_POINTS: usize = 10;

/// Upper bound on per-parameter grid points a caller may request.
///
/// 40⁴ = 2.56 M candidates.
pub const MAX_GRID_POINTS: usize = 40;

/// Default deadline for an optimization call (seconds).
pub const OPTIMIZE_TIMEOUT_SECS: u64 = 60;
