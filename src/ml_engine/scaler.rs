//! Feature standardization (zero mean, unit variance per feature).
//!
//! Fit once on the training inputs; the resulting [`ScalerState`] is stored
//! next to the forest and reapplied unchanged at inference time.

use serde::{Deserialize, Serialize};

use crate::types::{FeatureVector, NUM_FEATURES};

/// Per-feature mean and population standard deviation.
///
/// A feature whose variance is indistinguishable from zero has `std = 0.0`
/// and always transforms to `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean: [f64; NUM_FEATURES],
    pub std: [f64; NUM_FEATURES],
    /// Number of rows the statistics were computed from.
    pub n_samples: usize,
}

impl ScalerState {
    /// Compute column means and population standard deviations.
    ///
    /// Two-pass for numerical stability. Variance at or below
    /// `n · ε · mean²` is rounding noise from summing identical values and
    /// is treated as exactly zero.
    pub fn fit(rows: &[FeatureVector]) -> Self {
        let n = rows.len();
        let mut mean = [0.0; NUM_FEATURES];
        let mut std = [0.0; NUM_FEATURES];
        if n == 0 {
            return Self { mean, std, n_samples: 0 };
        }
        let nf = n as f64;

        for row in rows {
            for (m, x) in mean.iter_mut().zip(row.as_array()) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= nf;
        }

        let mut m2 = [0.0; NUM_FEATURES];
        for row in rows {
            for i in 0..NUM_FEATURES {
                let d = row.0[i] - mean[i];
                m2[i] += d * d;
            }
        }

        for i in 0..NUM_FEATURES {
            let variance = m2[i] / nf;
            let noise_floor = nf * f64::EPSILON * mean[i] * mean[i];
            std[i] = if variance <= noise_floor { 0.0 } else { variance.sqrt() };
        }

        Self { mean, std, n_samples: n }
    }

    /// `(x - mean) / std` per component; zero-variance features map to 0.
    pub fn transform(&self, x: &FeatureVector) -> FeatureVector {
        let mut out = [0.0; NUM_FEATURES];
        for i in 0..NUM_FEATURES {
            out[i] = if self.std[i] == 0.0 {
                0.0
            } else {
                (x.0[i] - self.mean[i]) / self.std[i]
            };
        }
        FeatureVector(out)
    }

    pub fn transform_batch(&self, rows: &[FeatureVector]) -> Vec<FeatureVector> {
        rows.iter().map(|r| self.transform(r)).collect()
    }
}
