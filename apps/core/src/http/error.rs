//! Maps application errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::actors::messages::ActorError;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        AppError::Timeout(_) | AppError::Actor(ActorError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let detail = match self {
            AppError::NotFound(detail) | AppError::Validation(detail) => detail,
            other => other.to_string(),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&AppError::NotFound("t".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&AppError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status_for(&AppError::Timeout("slow".into())), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            status_for(&AppError::Actor(ActorError::Timeout("slow".into()))),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&AppError::Actor(ActorError::LlmError("boom".into()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
