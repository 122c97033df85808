//! ML engine endpoints: train, predict, optimize

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::service::{OptimizeOptions, TrainOptions};
use crate::types::{ServiceError, TrainReport};

use super::super::envelope::{ApiError, ApiResponse};
use super::ApiState;

// ============================================================================
// Train
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: TrainReport,
}

/// `POST /api/ml/train`. The body is optional; an empty body trains with the
/// configured defaults.
pub async fn train_model(State(state): State<ApiState>, body: Bytes) -> Result<Response, ApiError> {
    let options: TrainOptions = if body.iter().all(u8::is_ascii_whitespace) {
        TrainOptions::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::InvalidInput(format!("invalid train request: {e}")))?
    };

    let report = state.service.train(options).await?;
    Ok(ApiResponse::ok(TrainResponse {
        message: "Model trained successfully",
        report,
    }))
}

// ============================================================================
// Predict
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    /// `[temperature, pressure, catalystAmount, reactionTime]`
    pub features: Vec<f64>,
}

/// `POST /api/ml/predict`
pub async fn predict_yield(
    State(state): State<ApiState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let prediction = state.service.predict(request.features).await?;
    Ok(ApiResponse::ok(prediction))
}

// ============================================================================
// Optimize
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OptimizeRequest {
    /// Parameter name → `[low, high]`
    pub ranges: HashMap<String, Vec<f64>>,
    #[serde(default)]
    pub grid_points: Option<usize>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// `POST /api/ml/optimize`
pub async fn optimize_parameters(
    State(state): State<ApiState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let options = OptimizeOptions {
        grid_points: request.grid_points,
        timeout_ms: request.timeout_ms,
    };
    let result = state.service.optimize(request.ranges, options).await?;
    Ok(ApiResponse::ok(result))
}
