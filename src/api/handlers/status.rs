//! Status, health and training history endpoints

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::defaults::{HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use crate::service::Readiness;
use crate::types::{ServiceError, TrainReport};

use super::super::envelope::ApiError;
use super::ApiState;

// ============================================================================
// Health
// ============================================================================

/// Liveness probe. Always 200 while the process serves HTTP; readiness is
/// reported in the body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub readiness: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        readiness: state.service.readiness().as_str(),
        uptime_seconds: state.service.uptime().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub readiness: Readiness,
    pub model_name: String,
    pub model_exists: bool,
    /// Most recent recorded run of the default model
    pub last_training: Option<TrainReport>,
    pub uptime_seconds: u64,
}

pub async fn get_status(State(state): State<ApiState>) -> Result<Json<StatusResponse>, ApiError> {
    let service = &state.service;
    Ok(Json(StatusResponse {
        readiness: (*service.readiness()).clone(),
        model_name: service.config().storage.default_model.clone(),
        model_exists: service.default_model_exists(),
        last_training: service.last_training().await?,
        uptime_seconds: service.uptime().as_secs(),
    }))
}

// ============================================================================
// Training History
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Maximum number of runs to return (default: 20)
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub runs: Vec<TrainReport>,
}

pub async fn get_history(
    State(state): State<ApiState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let limit = query.limit.unwrap_or(HISTORY_LIMIT);
    if limit == 0 || limit > MAX_HISTORY_LIMIT {
        return Err(ServiceError::InvalidInput(format!(
            "limit = {limit} must be in 1..={MAX_HISTORY_LIMIT}"
        ))
        .into());
    }
    let runs = state.service.history(limit).await?;
    Ok(Json(HistoryResponse {
        count: runs.len(),
        runs,
    }))
}
