//! Exhaustive grid search for the highest predicted yield.
//!
//! Every parameter range is sampled at `grid_points` evenly spaced values
//! and the full Cartesian product is scored in one batch. Enumeration order
//! is fixed (temperature outermost, reaction time innermost) and ties go to
//! the first point in that order, so results are reproducible.

use tracing::debug;

use crate::config::OptimizerConfig;
use crate::storage::{ModelArtifact, ModelStore};
use crate::types::{
    FeatureVector, OptimizationRequest, OptimizationResult, Parameter, ServiceError, NUM_FEATURES,
};

/// Cartesian grid over `request` in enumeration order.
pub fn build_grid(request: &OptimizationRequest, grid_points: usize) -> Vec<FeatureVector> {
    let axes: [Vec<f64>; NUM_FEATURES] =
        std::array::from_fn(|i| request.range(Parameter::ALL[i]).linspace(grid_points));
    let total: usize = axes.iter().map(Vec::len).product();

    let mut grid = Vec::with_capacity(total);
    for &t in &axes[0] {
        for &p in &axes[1] {
            for &c in &axes[2] {
                for &r in &axes[3] {
                    grid.push(FeatureVector::new(t, p, c, r));
                }
            }
        }
    }
    grid
}

/// Reject grid sizes outside `1..=max_grid_points`.
pub fn check_grid_points(grid_points: usize, limits: &OptimizerConfig) -> Result<(), ServiceError> {
    if grid_points == 0 || grid_points > limits.max_grid_points {
        return Err(ServiceError::InvalidInput(format!(
            "grid_points = {grid_points} must be in 1..={}",
            limits.max_grid_points
        )));
    }
    Ok(())
}

/// Load `name` and search `request` at `grid_points` per parameter.
pub fn optimize(
    store: &ModelStore,
    name: &str,
    request: &OptimizationRequest,
    grid_points: usize,
    limits: &OptimizerConfig,
) -> Result<OptimizationResult, ServiceError> {
    let artifact = store.load(name)?;
    check_grid_points(grid_points, limits)?;
    optimize_with(&artifact, request, grid_points)
}

/// Search with an already-loaded artifact.
///
/// Only an empty grid is rejected here; the upper bound is the caller's
/// job via [`check_grid_points`].
pub fn optimize_with(
    artifact: &ModelArtifact,
    request: &OptimizationRequest,
    grid_points: usize,
) -> Result<OptimizationResult, ServiceError> {
    if grid_points == 0 {
        return Err(ServiceError::InvalidInput("grid_points must be > 0".to_string()));
    }
    let grid = build_grid(request, grid_points);
    let scaled = artifact.scaler.transform_batch(&grid);
    let predictions = artifact.forest.predict_batch(&scaled);

    let mut best = 0;
    for (i, &p) in predictions.iter().enumerate().skip(1) {
        if p > predictions[best] {
            best = i;
        }
    }

    debug!(
        model = %artifact.name,
        evaluated = grid.len(),
        best_yield = predictions[best],
        "Grid search complete"
    );

    Ok(OptimizationResult {
        optimal_parameters: grid[best].into(),
        predicted_yield: predictions[best],
        evaluated_points: grid.len(),
    })
}
