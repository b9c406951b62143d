//! Domain error to HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::ports::GovernanceError;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Wrapper making `GovernanceError` usable as an axum response.
#[derive(Debug)]
pub struct ApiError(pub GovernanceError);

impl From<GovernanceError> for ApiError {
    fn from(err: GovernanceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            GovernanceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
            GovernanceError::InvalidMetric { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_metric"),
            GovernanceError::InvalidWeights { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_weights"),
            GovernanceError::UnknownThreshold(_) => (StatusCode::NOT_FOUND, "unknown_threshold"),
            GovernanceError::UnknownAgent(_) => (StatusCode::NOT_FOUND, "unknown_agent"),
            GovernanceError::UnknownLoop(_) => (StatusCode::NOT_FOUND, "unknown_loop"),
            GovernanceError::UnknownContradiction(_) => (StatusCode::NOT_FOUND, "unknown_contradiction"),
            GovernanceError::InvariantViolation(_) => (StatusCode::CONFLICT, "invariant_violation"),
            GovernanceError::MaxRerunsExceeded { .. } => (StatusCode::CONFLICT, "max_reruns_exceeded"),
            GovernanceError::Store(err) => {
                tracing::error!(error = %err, "record store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
        };

        let body = ErrorBody {
            error: code,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
