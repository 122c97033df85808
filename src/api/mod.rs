//! REST API module using Axum
//!
//! Exposes the yield service over HTTP with a uniform JSON envelope:
//! - `/api/ml/*` model operations, status and history
//! - `/health` liveness probe

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::ApiState;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

/// Request bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Build the CORS layer from the configured origin list.
///
/// An empty list allows any origin. Entries that are not valid header
/// values are skipped with a warning.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.trim().parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "CORS: ignoring invalid origin");
                None
            }
        })
        .collect();
    tracing::info!(origins = ?origins, "CORS: allowing configured origins");
    base.allow_origin(allowed)
}

/// Create the complete application router.
pub fn create_app(state: ApiState) -> Router {
    let cors = build_cors_layer(&state.service.config().server.cors_origins);

    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .merge(routes::health_routes(state))
        .fallback(handlers::not_found)
        // Middleware
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
