//! HTTP error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use command_center_core::error::CommandCenterError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid bearer token on a write endpoint.
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] CommandCenterError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, json!({"detail": self.to_string()}))
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, json!({"error": self.to_string()})),
            ApiError::Internal(e) => {
                error!(%e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({"error": e.to_string()}))
            }
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
