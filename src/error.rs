use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl From<crate::engine::MatchError> for AppError {
    fn from(err: crate::engine::MatchError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::engine::AggregateError> for AppError {
    fn from(err: crate::engine::AggregateError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<crate::engine::ReconcileError> for AppError {
    fn from(err: crate::engine::ReconcileError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        if status.is_server_error() {
            tracing::error!(error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
