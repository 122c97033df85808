//! Grid-search optimization request and result types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::process::{FeatureVector, Parameter, ParameterValues, NUM_FEATURES};

/// Inclusive search interval for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub low: f64,
    pub high: f64,
}

impl ParameterRange {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// `points` evenly spaced values from `low` to `high` inclusive.
    ///
    /// Interpolates as `low·(1-t) + high·t` so the span `high - low` is never
    /// formed and cannot overflow. Values are clamped into the range and both
    /// endpoints are exact.
    pub fn linspace(&self, points: usize) -> Vec<f64> {
        match points {
            0 => Vec::new(),
            1 => vec![self.low],
            _ => {
                let last = (points - 1) as f64;
                let mut values: Vec<f64> = (0..points)
                    .map(|i| {
                        let t = i as f64 / last;
                        (self.low * (1.0 - t) + self.high * t)
                            .max(self.low)
                            .min(self.high)
                    })
                    .collect();
                values[0] = self.low;
                values[points - 1] = self.high;
                values
            }
        }
    }
}

/// Why an optimization request was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RangeError {
    #[error("missing range for parameter '{0}'")]
    Missing(Parameter),
    #[error("range for '{0}' must be a [low, high] pair, got {1} values")]
    NotAPair(Parameter, usize),
    #[error("range for '{0}' contains a non-finite bound")]
    NonFinite(Parameter),
    #[error("range for '{parameter}' has low ({low}) > high ({high})")]
    Inverted { parameter: Parameter, low: f64, high: f64 },
}

/// Per-parameter search bounds, in feature order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub ranges: [ParameterRange; NUM_FEATURES],
}

impl OptimizationRequest {
    /// Validate and build a request from explicit ranges.
    pub fn new(ranges: [ParameterRange; NUM_FEATURES]) -> Result<Self, RangeError> {
        for parameter in Parameter::ALL {
            let range = ranges[parameter.index()];
            if !range.low.is_finite() || !range.high.is_finite() {
                return Err(RangeError::NonFinite(parameter));
            }
            if range.low > range.high {
                return Err(RangeError::Inverted {
                    parameter,
                    low: range.low,
                    high: range.high,
                });
            }
        }
        Ok(Self { ranges })
    }

    /// Parse the wire mapping `{ "temperature": [50, 150], ... }`.
    ///
    /// Unrecognised keys are ignored. Aliases resolve through
    /// [`Parameter::from_key`]; a later alias overrides an earlier one.
    pub fn from_map(raw: &HashMap<String, Vec<f64>>) -> Result<Self, RangeError> {
        let mut found: [Option<ParameterRange>; NUM_FEATURES] = [None; NUM_FEATURES];
        let mut keys: Vec<&String> = raw.keys().collect();
        keys.sort();

        for key in keys {
            let Some(parameter) = Parameter::from_key(key) else {
                tracing::debug!(key = %key, "Ignoring unknown optimization range key");
                continue;
            };
            let bounds = &raw[key];
            if bounds.len() != 2 {
                return Err(RangeError::NotAPair(parameter, bounds.len()));
            }
            found[parameter.index()] = Some(ParameterRange {
                low: bounds[0],
                high: bounds[1],
            });
        }

        let mut ranges = [ParameterRange { low: 0.0, high: 0.0 }; NUM_FEATURES];
        for parameter in Parameter::ALL {
            ranges[parameter.index()] =
                found[parameter.index()].ok_or(RangeError::Missing(parameter))?;
        }
        Self::new(ranges)
    }

    /// Ranges spanning the synthetic training domain.
    pub fn training_domain() -> Self {
        let mut ranges = [ParameterRange { low: 0.0, high: 0.0 }; NUM_FEATURES];
        for parameter in Parameter::ALL {
            let (low, high) = parameter.domain();
            ranges[parameter.index()] = ParameterRange { low, high };
        }
        Self { ranges }
    }

    pub fn range(&self, parameter: Parameter) -> ParameterRange {
        self.ranges[parameter.index()]
    }

    pub fn contains(&self, vector: &FeatureVector) -> bool {
        Parameter::ALL
            .iter()
            .all(|&p| self.range(p).contains(vector.get(p)))
    }
}

/// Best grid point found by the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimal_parameters: ParameterValues,
    pub predicted_yield: f64,
    pub evaluated_points: usize,
}
