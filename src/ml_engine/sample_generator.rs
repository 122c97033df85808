//! Synthetic training data.
//!
//! The only ground truth available to the service: uniform draws over the
//! process domains, labeled by a fixed non-linear yield function.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{FeatureVector, Parameter, Sample, TrainingSet, NUM_FEATURES};

/// Reference yield function, clamped to 0–100 %.
///
/// `100 * (0.4·T + 0.3·P² + 0.2·C + 0.1·t) / 100`
pub fn yield_function(x: &FeatureVector) -> f64 {
    let [temperature, pressure, catalyst, time] = *x.as_array();
    let raw = (0.4 * temperature + 0.3 * pressure.powi(2) + 0.2 * catalyst + 0.1 * time) / 100.0;
    (raw * 100.0).clamp(0.0, 100.0)
}

/// Generate `n` labeled samples, deterministic in `(seed, n)`.
///
/// Four uniform `[0, 1)` draws per sample, in feature order, each mapped
/// affinely onto the parameter's domain.
pub fn generate(seed: u64, n: usize) -> TrainingSet {
    let mut rng = StdRng::seed_from_u64(seed);
    let samples = (0..n)
        .map(|_| {
            let mut values = [0.0; NUM_FEATURES];
            for parameter in Parameter::ALL {
                let (low, high) = parameter.domain();
                let u: f64 = rng.gen();
                values[parameter.index()] = u * (high - low) + low;
            }
            let features = FeatureVector(values);
            Sample {
                features,
                yield_pct: yield_function(&features),
            }
        })
        .collect();
    TrainingSet { samples }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(42, 100);
        let b = generate(42, 100);
        assert_eq!(a, b);
        assert_eq!(a.len(), 100);
    }

    #[test]
    fn test_different_seeds_differ() {
        assert_ne!(generate(42, 10), generate(43, 10));
    }

    #[test]
    fn test_samples_within_domain() {
        let set = generate(7, 500);
        for s in &set.samples {
            for p in Parameter::ALL {
                let (low, high) = p.domain();
                let v = s.features.get(p);
                assert!(v >= low && v < high, "{p} = {v} outside [{low}, {high})");
            }
            assert!((0.0..=100.0).contains(&s.yield_pct));
        }
    }

    #[test]
    fn test_yield_function_reference_point() {
        // 0.4*100 + 0.3*25 + 0.2*1 + 0.1*12 = 48.9
        let y = yield_function(&FeatureVector::new(100.0, 5.0, 1.0, 12.0));
        assert!((y - 48.9).abs() < 1e-9);
    }

    #[test]
    fn test_yield_function_clamps() {
        assert_eq!(yield_function(&FeatureVector::new(1000.0, 100.0, 0.0, 0.0)), 100.0);
        assert_eq!(yield_function(&FeatureVector::new(-500.0, 0.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_generate_zero_samples() {
        assert!(generate(42, 0).is_empty());
    }
}
