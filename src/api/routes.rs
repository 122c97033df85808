//! API route definitions
//!
//! - POST /api/ml/train    - train the default model
//! - POST /api/ml/predict  - predict yield for one feature vector
//! - POST /api/ml/optimize - grid search over parameter ranges
//! - GET  /api/ml/status   - readiness and default model state
//! - GET  /api/ml/history  - recent training runs
//! - GET  /health          - liveness

use axum::{routing::{get, post}, Router};

use super::handlers::{self, ApiState};

/// Routes nested under `/api`
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/ml/train", post(handlers::train_model))
        .route("/ml/predict", post(handlers::predict_yield))
        .route("/ml/optimize", post(handlers::optimize_parameters))
        .route("/ml/status", get(handlers::get_status))
        .route("/ml/history", get(handlers::get_history))
        .with_state(state)
}

/// Health endpoint at root level
pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(state)
}
