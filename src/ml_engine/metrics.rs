//! Held-out evaluation: seeded train/test split and R².

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `0..n` with `seed` and split off the test partition.
///
/// The test partition has `ceil(test_fraction · n)` rows, clamped so both
/// partitions are non-empty when `n >= 2`. Returns `(train, test)`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_test = if n < 2 {
        0
    } else {
        ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1)
    };
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let train = order.split_off(n_test);
    (train, order)
}

/// Coefficient of determination, `1 - SS_res / SS_tot`.
///
/// Negative when the model is worse than predicting the mean. A constant
/// `y_true` scores 1.0 for perfect predictions and 0.0 otherwise; empty
/// input scores 0.0.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    debug_assert_eq!(y_true.len(), y_pred.len());
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(y, p)| (y - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
