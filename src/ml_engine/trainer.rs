//! Training pipeline: generate → scale → split → fit → score.
//!
//! Pure CPU work with no I/O; the service layer runs it on the blocking
//! pool and persists the result.

use tracing::{debug, info};

use crate::config::{ForestConfig, TrainingConfig};
use crate::types::{ServiceError, TrainingSet};

use super::forest::RandomForest;
use super::metrics::{r2_score, train_test_split};
use super::sample_generator;
use super::scaler::ScalerState;

/// A fitted forest with the scaler it was trained behind.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub forest: RandomForest,
    pub scaler: ScalerState,
    /// R² on the held-out partition
    pub score: f64,
    pub train_samples: usize,
    pub test_samples: usize,
}

/// Generate the synthetic set from `training` and fit on it.
pub fn train_synthetic(
    training: &TrainingConfig,
    forest: &ForestConfig,
) -> Result<TrainedModel, ServiceError> {
    let set = sample_generator::generate(training.seed, training.sample_count);
    debug!(samples = set.len(), seed = training.seed, "Generated synthetic training data");
    train_on(&set, training, forest)
}

/// Fit a scaler and forest on `set` and score them on a held-out split.
///
/// The scaler is fitted on every sample before splitting, so the test
/// partition shares its statistics.
pub fn train_on(
    set: &TrainingSet,
    training: &TrainingConfig,
    forest_config: &ForestConfig,
) -> Result<TrainedModel, ServiceError> {
    if set.len() < 2 {
        return Err(ServiceError::InsufficientData(format!(
            "need at least 2 samples, got {}",
            set.len()
        )));
    }
    let targets = set.targets();
    if targets.iter().all(|&y| y == targets[0]) {
        return Err(ServiceError::InsufficientData(
            "training targets have no variance".to_string(),
        ));
    }

    let features = set.features();
    let scaler = ScalerState::fit(&features);
    let scaled = scaler.transform_batch(&features);

    let (train_idx, test_idx) =
        train_test_split(set.len(), training.test_fraction, training.split_seed);
    if train_idx.len() < 2 || test_idx.is_empty() {
        return Err(ServiceError::InsufficientData(format!(
            "{} samples cannot be split into train and test partitions",
            set.len()
        )));
    }

    let x_train: Vec<_> = train_idx.iter().map(|&i| scaled[i]).collect();
    let y_train: Vec<f64> = train_idx.iter().map(|&i| targets[i]).collect();
    let forest = RandomForest::fit(&x_train, &y_train, forest_config)?;

    let x_test: Vec<_> = test_idx.iter().map(|&i| scaled[i]).collect();
    let y_test: Vec<f64> = test_idx.iter().map(|&i| targets[i]).collect();
    let score = r2_score(&y_test, &forest.predict_batch(&x_test));

    info!(
        score = format!("{:.4}", score),
        train = train_idx.len(),
        test = test_idx.len(),
        trees = forest.tree_count(),
        "Model trained"
    );

    Ok(TrainedModel {
        forest,
        scaler,
        score,
        train_samples: train_idx.len(),
        test_samples: test_idx.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FeatureVector, Sample};

    fn quick_forest() -> ForestConfig {
        ForestConfig {
            tree_count: 20,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_reference_training_scores_well() {
        let model = train_synthetic(&TrainingConfig::default(), &quick_forest()).unwrap();
        assert_eq!(model.train_samples, 80);
        assert_eq!(model.test_samples, 20);
        assert!(model.score.is_finite());
        // Smooth low-noise target: even a small forest explains most variance
        assert!(model.score > 0.5, "score = {}", model.score);
    }

    #[test]
    fn test_training_is_reproducible() {
        let a = train_synthetic(&TrainingConfig::default(), &quick_forest()).unwrap();
        let b = train_synthetic(&TrainingConfig::default(), &quick_forest()).unwrap();
        assert_eq!(a.score, b.score);
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.scaler, b.scaler);
    }

    #[test]
    fn test_too_few_samples() {
        let training = TrainingConfig {
            sample_count: 1,
            ..TrainingConfig::default()
        };
        let err = train_synthetic(&training, &quick_forest()).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));
    }

    #[test]
    fn test_constant_targets() {
        let set = TrainingSet {
            samples: (0..10)
                .map(|i| Sample {
                    features: FeatureVector::new(f64::from(i), 1.0, 1.0, 1.0),
                    yield_pct: 50.0,
                })
                .collect(),
        };
        let err = train_on(&set, &TrainingConfig::default(), &quick_forest()).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));
    }

    #[test]
    fn test_two_samples_cannot_split() {
        let set = TrainingSet {
            samples: vec![
                Sample {
                    features: FeatureVector::new(60.0, 2.0, 0.5, 3.0),
                    yield_pct: 30.0,
                },
                Sample {
                    features: FeatureVector::new(140.0, 9.0, 1.5, 20.0),
                    yield_pct: 85.0,
                },
            ],
        };
        let err = train_on(&set, &TrainingConfig::default(), &quick_forest()).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));
    }
}
