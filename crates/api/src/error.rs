//! Chat-facing error type. Every error body still carries a `reply` so the
//! widget always has something to show.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("message exceeds {max} characters")]
    MessageTooLong { max: usize },

    #[error("rate limited, retry after {0:?}")]
    RateLimited(Duration),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            ApiError::InvalidBody(_) => (
                StatusCode::BAD_REQUEST,
                "invalid_body",
                "Beskeden kunne ikke læses. Prøv venligst igen.",
            ),
            ApiError::MessageTooLong { .. } => (
                StatusCode::BAD_REQUEST,
                "message_too_long",
                "Din besked er for lang. Prøv at skrive den lidt kortere.",
            ),
            ApiError::RateLimited(_) => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Du sender beskeder for hurtigt. Vent et øjeblik og prøv igen.",
            ),
            ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Der opstod en serverfejl.",
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, reply) = self.parts();
        let body = json!({ "reply": reply, "error": code });
        let mut response = (status, Json(body)).into_response();

        if let ApiError::RateLimited(retry_after) = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
