use crate::StitchError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    pub kind: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
    pub kind: String,
}

impl ApiError {
    pub fn new(status: StatusCode, kind: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
            kind: kind.to_string(),
        }
    }

    pub fn unprocessable(kind: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, kind, detail)
    }

    pub fn timeout(limit_ms: u64) -> Self {
        Self::new(
            StatusCode::GATEWAY_TIMEOUT,
            "Timeout",
            format!("stitch did not finish within {limit_ms} ms"),
        )
    }

    pub fn internal(kind: &str, detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, kind, detail)
    }
}

impl From<StitchError> for ApiError {
    fn from(err: StitchError) -> Self {
        if err.is_input_error() {
            return Self::unprocessable(err.kind(), err.to_string());
        }
        tracing::error!(error = %err, kind = err.kind(), "Stitch request failed");
        match err {
            StitchError::EncodingFailed(_) => Self::internal(err.kind(), "encode failed"),
            _ => Self::internal(err.kind(), "stitch failed"),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        let status = err.status();
        // Oversized bodies keep their 413; everything else is a malformed form.
        let status = if status == StatusCode::PAYLOAD_TOO_LARGE {
            status
        } else {
            StatusCode::UNPROCESSABLE_ENTITY
        };
        Self::new(status, "MalformedForm", err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail,
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}
