//! Consistent response envelope for all API endpoints.
//!
//! Success: `{ "success": true, ...payload fields }`
//! Failure: `{ "success": false, "code": "...", "message": "..." }`

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::types::ServiceError;

/// Successful response with the payload's fields inlined.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Response {
        (StatusCode::OK, Json(Self { success: true, data })).into_response()
    }
}

/// Failure body.
#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}

impl ApiErrorResponse {
    pub fn build(status: StatusCode, code: &str, msg: impl Into<String>) -> Response {
        let body = Self {
            success: false,
            code: code.to_string(),
            message: msg.into(),
        };
        (status, Json(body)).into_response()
    }

    pub fn not_found(msg: impl Into<String>) -> Response {
        Self::build(StatusCode::NOT_FOUND, "NOT_FOUND", msg)
    }
}

/// Handler error: a [`ServiceError`] rendered as a failure envelope.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::InsufficientData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_caller_facing() {
            self.0.to_string()
        } else {
            error!(code = self.0.code(), error = %self.0, "Request failed with internal error");
            "Internal server error".to_string()
        };
        ApiErrorResponse::build(status, self.0.code(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"prediction": 42.0}));
        assert_eq!(resp.status(), StatusCode::OK);
        let v = body_json(resp).await;
        assert_eq!(v["success"], true);
        assert_eq!(v["prediction"], 42.0);
    }

    #[tokio::test]
    async fn test_error_response_shape() {
        let resp = ApiError(ServiceError::ModelNotFound("yield_model".into())).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let v = body_json(resp).await;
        assert_eq!(v["success"], false);
        assert_eq!(v["code"], "MODEL_NOT_FOUND");
        assert!(v["message"].as_str().unwrap().contains("train the model first"));
    }

    #[tokio::test]
    async fn test_storage_error_is_masked() {
        let err = ServiceError::Storage(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "/var/lib/models/secret",
        )));
        let resp = ApiError(err).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v = body_json(resp).await;
        assert_eq!(v["code"], "STORAGE_ERROR");
        assert!(!v["message"].as_str().unwrap().contains("secret"));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ServiceError::InvalidInput(String::new()), StatusCode::BAD_REQUEST),
            (ServiceError::InsufficientData(String::new()), StatusCode::UNPROCESSABLE_ENTITY),
            (ServiceError::NotReady(String::new()), StatusCode::SERVICE_UNAVAILABLE),
            (
                ServiceError::DeadlineExceeded(std::time::Duration::from_secs(1)),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (ServiceError::Internal(String::new()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
