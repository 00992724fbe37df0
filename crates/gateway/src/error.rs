//! Error responses.

use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use subserver_core::error::{ProviderError, VectorError};
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into() }))
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, message)
}

/// Map a main server failure: upstream status passes through, timeouts are
/// 504 and connection failures 502.
pub fn provider_error(e: &ProviderError, main_url: &str) -> ApiError {
    let status = StatusCode::from_u16(e.gateway_status()).unwrap_or(StatusCode::BAD_GATEWAY);
    let message = match e {
        ProviderError::Timeout(_) => "Main server request timed out".to_string(),
        ProviderError::Connect(_) => format!("Cannot connect to main server: {main_url}"),
        ProviderError::ApiError { message, .. } => format!("Main server call failed: {message}"),
        other => other.to_string(),
    };
    error!(status = status.as_u16(), error = %e, "Main server call failed");
    api_error(status, message)
}

pub fn vector_error(e: VectorError) -> ApiError {
    let status = match &e {
        VectorError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        VectorError::InvalidInput(_) | VectorError::DimensionMismatch { .. } => StatusCode::BAD_REQUEST,
        VectorError::EmbeddingFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %e, "Vector operation failed");
    }
    api_error(status, e.to_string())
}
