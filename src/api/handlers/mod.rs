//! API route handlers
//!
//! - `ml`: train, predict and optimize
//! - `status`: liveness, readiness and training history

mod ml;
mod status;

pub use ml::*;
pub use status::*;

use std::sync::Arc;

use axum::response::Response;

use crate::service::YieldService;

use super::envelope::ApiErrorResponse;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<YieldService>,
}

impl ApiState {
    pub fn new(service: Arc<YieldService>) -> Self {
        Self { service }
    }
}

/// Fallback for unmatched routes.
pub async fn not_found() -> Response {
    ApiErrorResponse::not_found("No such endpoint")
}
