//! Single-point yield prediction against a stored model.

use crate::storage::{ModelArtifact, ModelStore};
use crate::types::{FeatureVector, Prediction, ServiceError};

/// Load `name` and predict the yield for raw (unscaled) `features`.
///
/// The model is resolved first, so a missing model reports `ModelNotFound`
/// even when the features are also malformed.
pub fn predict(store: &ModelStore, name: &str, features: &[f64]) -> Result<Prediction, ServiceError> {
    let artifact = store.load(name)?;
    predict_with(&artifact, features)
}

/// Predict with an already-loaded artifact.
pub fn predict_with(artifact: &ModelArtifact, features: &[f64]) -> Result<Prediction, ServiceError> {
    let x = FeatureVector::try_from(features)?;
    let scaled = artifact.scaler.transform(&x);
    Ok(Prediction {
        prediction: artifact.forest.predict(&scaled),
        feature_importance: artifact.forest.feature_importances().into(),
    })
}
