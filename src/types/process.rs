//! Process parameters and feature vectors.
//!
//! The feature order is fixed: temperature, pressure, catalyst amount,
//! reaction time. Every call site (generation, scaling, forest input, grid
//! enumeration, wire encoding) goes through [`Parameter::ALL`].

use serde::{Deserialize, Serialize};

/// Number of process parameters fed to the model.
pub const NUM_FEATURES: usize = 4;

/// A controllable process parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parameter {
    /// Reactor temperature (°C)
    Temperature,
    /// Reactor pressure (MPa)
    Pressure,
    /// Catalyst loading (g)
    CatalystAmount,
    /// Reaction time (h)
    ReactionTime,
}

impl Parameter {
    /// All parameters in model feature order.
    pub const ALL: [Parameter; NUM_FEATURES] = [
        Parameter::Temperature,
        Parameter::Pressure,
        Parameter::CatalystAmount,
        Parameter::ReactionTime,
    ];

    /// Column index in a [`FeatureVector`].
    pub const fn index(self) -> usize {
        match self {
            Parameter::Temperature => 0,
            Parameter::Pressure => 1,
            Parameter::CatalystAmount => 2,
            Parameter::ReactionTime => 3,
        }
    }

    /// Canonical wire key.
    pub const fn key(self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Pressure => "pressure",
            Parameter::CatalystAmount => "catalystAmount",
            Parameter::ReactionTime => "reactionTime",
        }
    }

    /// Range the synthetic sample generator draws from.
    pub const fn domain(self) -> (f64, f64) {
        match self {
            Parameter::Temperature => (50.0, 150.0),
            Parameter::Pressure => (1.0, 10.0),
            Parameter::CatalystAmount => (0.1, 2.0),
            Parameter::ReactionTime => (1.0, 24.0),
        }
    }

    /// Parse a request key. Accepts the canonical camelCase key, snake_case,
    /// and the legacy Japanese labels used by the original dashboard.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "temperature" | "温度" => Some(Parameter::Temperature),
            "pressure" | "圧力" => Some(Parameter::Pressure),
            "catalystAmount" | "catalyst_amount" | "触媒量" => Some(Parameter::CatalystAmount),
            "reactionTime" | "reaction_time" | "反応時間" => Some(Parameter::ReactionTime),
            _ => None,
        }
    }
}

impl std::fmt::Display for Parameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Ordered process-parameter tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(pub [f64; NUM_FEATURES]);

impl FeatureVector {
    pub const fn new(
        temperature: f64,
        pressure: f64,
        catalyst_amount: f64,
        reaction_time: f64,
    ) -> Self {
        Self([temperature, pressure, catalyst_amount, reaction_time])
    }

    pub fn get(&self, parameter: Parameter) -> f64 {
        self.0[parameter.index()]
    }

    pub fn as_array(&self) -> &[f64; NUM_FEATURES] {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Rejected feature slice: wrong arity or non-finite component.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeatureVectorError {
    #[error("expected {NUM_FEATURES} features, got {0}")]
    WrongLength(usize),
    #[error("feature '{0}' is not a finite number")]
    NonFinite(Parameter),
}

impl TryFrom<&[f64]> for FeatureVector {
    type Error = FeatureVectorError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let array: [f64; NUM_FEATURES] = values
            .try_into()
            .map_err(|_| FeatureVectorError::WrongLength(values.len()))?;
        for parameter in Parameter::ALL {
            if !array[parameter.index()].is_finite() {
                return Err(FeatureVectorError::NonFinite(parameter));
            }
        }
        Ok(Self(array))
    }
}

/// One labeled sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub features: FeatureVector,
    /// Yield percentage, 0–100
    pub yield_pct: f64,
}

/// Ordered labeled samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingSet {
    pub samples: Vec<Sample>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn features(&self) -> Vec<FeatureVector> {
        self.samples.iter().map(|s| s.features).collect()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.yield_pct).collect()
    }
}

/// One value per parameter, serialized as an object keyed by parameter name.
///
/// Used for both feature importances and optimal parameter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValues {
    pub temperature: f64,
    pub pressure: f64,
    pub catalyst_amount: f64,
    pub reaction_time: f64,
}

impl ParameterValues {
    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Pressure => self.pressure,
            Parameter::CatalystAmount => self.catalyst_amount,
            Parameter::ReactionTime => self.reaction_time,
        }
    }
}

impl From<[f64; NUM_FEATURES]> for ParameterValues {
    fn from(values: [f64; NUM_FEATURES]) -> Self {
        Self {
            temperature: values[0],
            pressure: values[1],
            catalyst_amount: values[2],
            reaction_time: values[3],
        }
    }
}

impl From<FeatureVector> for ParameterValues {
    fn from(vector: FeatureVector) -> Self {
        Self::from(vector.0)
    }
}

impl From<ParameterValues> for FeatureVector {
    fn from(values: ParameterValues) -> Self {
        Self::new(
            values.temperature,
            values.pressure,
            values.catalyst_amount,
            values.reaction_time,
        )
    }
}
