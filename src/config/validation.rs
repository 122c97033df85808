//! Config validation: unknown-key detection with Levenshtein suggestions
//! and value range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::defaults::MAX_MODEL_NAME_LEN;
use super::ServiceConfig;

/// A non-fatal config warning (typo, unknown key).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for ServiceConfig.
///
/// Any new field added to ServiceConfig must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [server]
        "server",
        "server.addr",
        "server.cors_origins",
        // [storage]
        "storage",
        "storage.models_dir",
        "storage.default_model",
        "storage.history_db",
        // [training]
        "training",
        "training.seed",
        "training.sample_count",
        "training.test_fraction",
        "training.split_seed",
        "training.timeout_secs",
        "training.bootstrap",
        "training.max_sample_count",
        // [forest]
        "forest",
        "forest.tree_count",
        "forest.seed",
        "forest.max_depth",
        "forest.min_samples_split",
        "forest.min_samples_leaf",
        "forest.max_features",
        // [optimizer]
        "optimizer",
        "optimizer.grid_points",
        "optimizer.max_grid_points",
        "optimizer.timeout_secs",
    ];
    keys.iter().copied().collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
///
/// Ties resolve to the lexicographically smallest key so suggestions are
/// stable across runs.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    let mut candidates: Vec<&str> = known.iter().copied().collect();
    candidates.sort_unstable();
    candidates
        .into_iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|&(_, d)| d <= 3)
        .min_by_key(|&(_, d)| d)
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| {
            let suggestion = suggest_correction(&key, &known);
            ValidationWarning {
                message: format!("Unknown config key '{key}'"),
                field: key,
                suggestion,
            }
        })
        .collect()
}

// ============================================================================
// Model Names
// ============================================================================

/// Model names become file names: 1-64 chars of `[A-Za-z0-9_-]`.
pub fn is_valid_model_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_MODEL_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

// ============================================================================
// Range Validation
// ============================================================================

/// Check every value that would make training or optimization impossible.
///
/// Returns one message per violation.
pub fn validate_ranges(config: &ServiceConfig) -> Vec<String> {
    let mut errors = Vec::new();

    if !is_valid_model_name(&config.storage.default_model) {
        errors.push(format!(
            "storage.default_model = '{}' must be 1-{} characters of [A-Za-z0-9_-]",
            config.storage.default_model, MAX_MODEL_NAME_LEN
        ));
    }

    let t = &config.training;
    if t.sample_count < 2 {
        errors.push(format!(
            "training.sample_count = {} must be >= 2",
            t.sample_count
        ));
    }
    if !(t.test_fraction > 0.0 && t.test_fraction < 1.0) {
        errors.push(format!(
            "training.test_fraction = {} must be in (0, 1)",
            t.test_fraction
        ));
    }
    if t.sample_count > t.max_sample_count {
        errors.push(format!(
            "training.sample_count ({}) must be <= training.max_sample_count ({})",
            t.sample_count, t.max_sample_count
        ));
    }
    if t.timeout_secs == 0 {
        errors.push("training.timeout_secs must be > 0".to_string());
    }

    let f = &config.forest;
    if f.tree_count == 0 {
        errors.push("forest.tree_count must be > 0".to_string());
    }
    if f.min_samples_split < 2 {
        errors.push(format!(
            "forest.min_samples_split = {} must be >= 2",
            f.min_samples_split
        ));
    }
    if f.min_samples_leaf == 0 {
        errors.push("forest.min_samples_leaf must be > 0".to_string());
    }
    if f.max_depth == Some(0) {
        errors.push("forest.max_depth must be > 0 when set".to_string());
    }
    if let Some(m) = f.max_features {
        if m == 0 || m > crate::types::NUM_FEATURES {
            errors.push(format!(
                "forest.max_features = {m} must be in 1..={}",
                crate::types::NUM_FEATURES
            ));
        }
    }

    let o = &config.optimizer;
    if o.grid_points == 0 {
        errors.push("optimizer.grid_points must be > 0".to_string());
    }
    if o.grid_points > o.max_grid_points {
        errors.push(format!(
            "optimizer.grid_points ({}) must be <= optimizer.max_grid_points ({})",
            o.grid_points, o.max_grid_points
        ));
    }
    if o.timeout_secs == 0 {
        errors.push("optimizer.timeout_secs must be > 0".to_string());
    }

    errors
}
