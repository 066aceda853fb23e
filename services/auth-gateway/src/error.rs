//! Request-level errors and their JSON rendering
//!
//! Every error body has the shape
//! `{"error": {"type", "message", "request_id"}}`. Backend status failures are
//! the exception: they are passed through with the backend's own body.

use adapter::AdapterError;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("please sign in")]
    Unauthenticated,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Identity provider or transport failure
    #[error("{0}")]
    BadGateway(String),

    /// Backend answered non-2xx; forwarded as-is
    #[error("backend returned {status}")]
    Backend { status: u16, body: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated => "unauthenticated",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "invalid_request",
            ApiError::BadGateway(_) => "bad_gateway",
            ApiError::Backend { .. } => "backend_error",
            ApiError::Internal(_) => "internal_error",
        }
    }

    /// Render as an HTTP response tagged with `request_id`.
    pub fn into_response_with(self, request_id: &str) -> Response {
        let status = self.status();
        if let ApiError::Backend { body, .. } = self {
            let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            return (status, [(CONTENT_TYPE, content_type)], body).into_response();
        }
        error_response(status, self.kind(), &self.to_string(), request_id)
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Unauthenticated => ApiError::Unauthenticated,
            AdapterError::Status { status, body } => ApiError::Backend { status, body },
            AdapterError::Http(msg) => ApiError::BadGateway(format!("backend unreachable: {msg}")),
            AdapterError::Decode(msg) => {
                ApiError::BadGateway(format!("backend response unreadable: {msg}"))
            }
            AdapterError::Unsupported(_) | AdapterError::Session(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

pub fn error_response(status: StatusCode, kind: &str, message: &str, request_id: &str) -> Response {
    let body = serde_json::json!({
        "error": {
            "type": kind,
            "message": message,
            "request_id": request_id,
        }
    });
    (status, [(CONTENT_TYPE, "application/json")], body.to_string()).into_response()
}
