//! Service Configuration - every pipeline constant as an operator-tunable TOML value
//!
//! Each section implements `Default` with the reference values from
//! `defaults.rs`, so an absent config file reproduces the reference
//! behaviour exactly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;

/// Env var pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "YIELDCAST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "yieldcast.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration, initialized once at process start and shared as
/// `Arc<ServiceConfig>`; never mutated afterwards.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$YIELDCAST_CONFIG` env var
/// 2. `./yieldcast.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Artifact locations and default model name
    #[serde(default)]
    pub storage: StorageConfig,

    /// Synthetic data and train/test split
    #[serde(default)]
    pub training: TrainingConfig,

    /// Random forest construction
    #[serde(default)]
    pub forest: ForestConfig,

    /// Grid search
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$YIELDCAST_CONFIG` environment variable
    /// 2. `./yieldcast.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded service config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./yieldcast.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded service config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are reported as warnings, never as errors.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all values for internal consistency.
    ///
    /// Every violation is collected so the operator sees the full list at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = super::validation::validate_ranges(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `YIELDCAST_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Allowed CORS origins. Empty allows any origin.
    ///
    /// Can be overridden by `YIELDCAST_CORS_ORIGINS` (comma-separated).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            cors_origins: Vec::new(),
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for `<name>.model.json` / `<name>_scaler.json`
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Model served by the HTTP endpoints and trained at startup
    #[serde(default = "default_model_name")]
    pub default_model: String,

    /// Sled database for the training history ledger
    #[serde(default = "default_history_db")]
    pub history_db: PathBuf,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from(defaults::MODELS_DIR)
}
fn default_model_name() -> String {
    defaults::DEFAULT_MODEL_NAME.to_string()
}
fn default_history_db() -> PathBuf {
    PathBuf::from(defaults::HISTORY_DB_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            default_model: default_model_name(),
            history_db: default_history_db(),
        }
    }
}

// ============================================================================
// Training
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Seed for synthetic sample generation
    #[serde(default = "default_data_seed")]
    pub seed: u64,

    /// Synthetic samples per run
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    /// Held-out fraction for R² scoring, exclusive (0, 1)
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Shuffle seed for the train/test split
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,

    /// Deadline applied when the caller gives none
    #[serde(default = "default_train_timeout_secs")]
    pub timeout_secs: u64,

    /// Train the default model at startup when it is absent
    #[serde(default = "default_bootstrap")]
    pub bootstrap: bool,

    /// Largest `sample_count` a caller may request
    #[serde(default = "default_max_sample_count")]
    pub max_sample_count: usize,
}

fn default_data_seed() -> u64 { defaults::DATA_SEED }
fn default_sample_count() -> usize { defaults::SAMPLE_COUNT }
fn default_test_fraction() -> f64 { defaults::TEST_FRACTION }
fn default_split_seed() -> u64 { defaults::SPLIT_SEED }
fn default_train_timeout_secs() -> u64 { defaults::TRAIN_TIMEOUT_SECS }
fn default_bootstrap() -> bool { true }
fn default_max_sample_count() -> usize { defaults::MAX_SAMPLE_COUNT }

impl TrainingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: default_data_seed(),
            sample_count: default_sample_count(),
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            timeout_secs: default_train_timeout_secs(),
            bootstrap: default_bootstrap(),
            max_sample_count: default_max_sample_count(),
        }
    }
}

// ============================================================================
// Forest
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees
    #[serde(default = "default_tree_count")]
    pub tree_count: usize,

    /// Master seed; per-tree seeds are drawn from it in tree order
    #[serde(default = "default_forest_seed")]
    pub seed: u64,

    /// Maximum tree depth (unset = grow until leaves are pure)
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Features examined per split (unset = all features)
    #[serde(default)]
    pub max_features: Option<usize>,
}

fn default_tree_count() -> usize { defaults::TREE_COUNT }
fn default_forest_seed() -> u64 { defaults::FOREST_SEED }
fn default_min_samples_split() -> usize { defaults::MIN_SAMPLES_SPLIT }
fn default_min_samples_leaf() -> usize { defaults::MIN_SAMPLES_LEAF }

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            tree_count: default_tree_count(),
            seed: default_forest_seed(),
            max_depth: None,
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            max_features: None,
        }
    }
}

// ============================================================================
// Optimizer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Grid points per parameter when the caller gives none
    #[serde(default = "default_grid_points")]
    pub grid_points: usize,

    /// Largest per-parameter grid a caller may request
    #[serde(default = "default_max_grid_points")]
    pub max_grid_points: usize,

    /// Deadline applied when the caller gives none
    #[serde(default = "default_optimize_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_grid_points() -> usize { defaults::GRID_POINTS }
fn default_max_grid_points() -> usize { defaults::MAX_GRID_POINTS }
fn default_optimize_timeout_secs() -> u64 { defaults::OPTIMIZE_TIMEOUT_SECS }

impl OptimizerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            grid_points: default_grid_points(),
            max_grid_points: default_max_grid_points(),
            timeout_secs: default_optimize_timeout_secs(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
