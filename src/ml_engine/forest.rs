//! Random forest regressor.
//!
//! Bagged ensemble of [`RegressionTree`]s. Per-tree seeds are drawn
//! sequentially from one master RNG before any tree is grown, so trees can
//! be fitted on the rayon pool in any order and the ensemble is still
//! identical for a given `(data, config)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ForestConfig;
use crate::types::{FeatureVector, ServiceError, NUM_FEATURES};

use super::tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    params: TreeParams,
    seed: u64,
}

impl RandomForest {
    /// Fit `config.tree_count` trees on bootstrap resamples of `(x, y)`.
    ///
    /// Fails with `InsufficientData` for fewer than two rows or a constant
    /// target, and `InvalidInput` for mismatched lengths or non-finite values.
    pub fn fit(x: &[FeatureVector], y: &[f64], config: &ForestConfig) -> Result<Self, ServiceError> {
        if x.len() != y.len() {
            return Err(ServiceError::InvalidInput(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        if x.len() < 2 {
            return Err(ServiceError::InsufficientData(format!(
                "need at least 2 samples, got {}",
                x.len()
            )));
        }
        if !x.iter().all(FeatureVector::is_finite) || !y.iter().all(|v| v.is_finite()) {
            return Err(ServiceError::InvalidInput(
                "training data contains non-finite values".to_string(),
            ));
        }
        if y.iter().all(|&v| v == y[0]) {
            return Err(ServiceError::InsufficientData(
                "target has no variance".to_string(),
            ));
        }
        if config.tree_count == 0 {
            return Err(ServiceError::InvalidInput("tree_count must be > 0".to_string()));
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            min_samples_leaf: config.min_samples_leaf.max(1),
            max_features: config.max_features.unwrap_or(NUM_FEATURES),
        };

        let mut master = StdRng::seed_from_u64(config.seed);
        let seeds: Vec<u64> = (0..config.tree_count).map(|_| master.gen()).collect();
        let n = x.len();

        let trees: Vec<RegressionTree> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(x, y, bootstrap, params, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            samples = n,
            mean_depth = trees.iter().map(RegressionTree::depth).sum::<usize>() as f64
                / trees.len() as f64,
            "Random forest fitted"
        );

        Ok(Self {
            trees,
            params,
            seed: config.seed,
        })
    }

    /// Mean of the per-tree predictions.
    pub fn predict(&self, x: &FeatureVector) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        sum / self.trees.len() as f64
    }

    /// Predictions in input order.
    pub fn predict_batch(&self, xs: &[FeatureVector]) -> Vec<f64> {
        xs.par_iter().map(|x| self.predict(x)).collect()
    }

    /// Mean decrease in impurity per feature, summing to 1.
    ///
    /// Each tree's importances are normalized first; single-leaf trees are
    /// skipped. All zeros if no tree ever split.
    pub fn feature_importances(&self) -> [f64; NUM_FEATURES] {
        let mut total = [0.0; NUM_FEATURES];
        let mut contributing = 0usize;
        for imp in self.trees.iter().filter_map(RegressionTree::normalized_importances) {
            for (t, v) in total.iter_mut().zip(imp) {
                *t += v;
            }
            contributing += 1;
        }
        if contributing == 0 {
            return total;
        }
        let sum: f64 = total.iter().sum();
        for t in &mut total {
            *t /= sum;
        }
        total
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Non-empty and every tree structurally sound.
    pub fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(RegressionTree::is_well_formed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::sample_generator::generate;

    fn small_config(tree_count: usize) -> ForestConfig {
        ForestConfig {
            tree_count,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let set = generate(42, 60);
        let (x, y) = (set.features(), set.targets());
        let a = RandomForest::fit(&x, &y, &small_config(12)).unwrap();
        let b = RandomForest::fit(&x, &y, &small_config(12)).unwrap();
        assert_eq!(a, b);
        let probe = FeatureVector::new(100.0, 5.0, 1.0, 12.0);
        assert_eq!(a.predict(&probe), b.predict(&probe));
    }

    #[test]
    fn test_different_seed_changes_forest() {
        let set = generate(42, 60);
        let (x, y) = (set.features(), set.targets());
        let a = RandomForest::fit(&x, &y, &small_config(8)).unwrap();
        let b = RandomForest::fit(
            &x,
            &y,
            &ForestConfig {
                seed: 7,
                ..small_config(8)
            },
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_predictions_within_target_range() {
        let set = generate(1, 80);
        let (x, y) = (set.features(), set.targets());
        let forest = RandomForest::fit(&x, &y, &small_config(20)).unwrap();
        let lo = y.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // Leaves are means of training targets, so the ensemble stays inside
        for p in forest.predict_batch(&generate(2, 50).features()) {
            assert!(p >= lo - 1e-9 && p <= hi + 1e-9);
        }
    }

    #[test]
    fn test_batch_matches_single() {
        let set = generate(3, 40);
        let (x, y) = (set.features(), set.targets());
        let forest = RandomForest::fit(&x, &y, &small_config(10)).unwrap();
        let batch = forest.predict_batch(&x);
        for (row, p) in x.iter().zip(batch) {
            assert_eq!(forest.predict(row), p);
        }
    }

    #[test]
    fn test_importances_sum_to_one_and_rank_temperature_first() {
        let set = generate(42, 200);
        let (x, y) = (set.features(), set.targets());
        let forest = RandomForest::fit(&x, &y, &small_config(30)).unwrap();
        let imp = forest.feature_importances();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp.iter().all(|&v| v >= 0.0));
        // 0.4·T spans 40 points of yield; nothing else comes close
        let top = imp
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(top, 0);
    }

    #[test]
    fn test_rejects_degenerate_data() {
        let x = vec![FeatureVector::new(1.0, 1.0, 1.0, 1.0)];
        let err = RandomForest::fit(&x, &[5.0], &small_config(3)).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));

        let x = vec![
            FeatureVector::new(1.0, 1.0, 1.0, 1.0),
            FeatureVector::new(2.0, 2.0, 2.0, 2.0),
        ];
        let err = RandomForest::fit(&x, &[5.0, 5.0], &small_config(3)).unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientData(_)));

        let err = RandomForest::fit(&x, &[5.0], &small_config(3)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = RandomForest::fit(&x, &[5.0, f64::NAN], &small_config(3)).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn test_serde_preserves_predictions() {
        let set = generate(5, 30);
        let (x, y) = (set.features(), set.targets());
        let forest = RandomForest::fit(&x, &y, &small_config(5)).unwrap();
        let json = serde_json::to_string(&forest).unwrap();
        let back: RandomForest = serde_json::from_str(&json).unwrap();
        assert!(back.is_well_formed());
        for row in &x {
            assert_eq!(forest.predict(row), back.predict(row));
        }
    }
}
