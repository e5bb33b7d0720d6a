use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::TranscriptError;

/// JSON error body returned by every handler
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: &'static str,
    message: String,
    video_url: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
            video_url: None,
        }
    }

    pub fn bad_request(error: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    /// Wrap a failed operation, choosing the status from the domain error in the chain
    pub fn from_error(error: &'static str, err: anyhow::Error) -> Self {
        let status = match err.downcast_ref::<TranscriptError>() {
            Some(TranscriptError::InvalidUrl(_) | TranscriptError::InvalidRequest(_)) => {
                StatusCode::BAD_REQUEST
            }
            Some(TranscriptError::CaptionsNotFound { .. }) => StatusCode::NOT_FOUND,
            Some(TranscriptError::ToolUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
            Some(TranscriptError::ToolInvocationFailure(_)) => StatusCode::BAD_GATEWAY,
            Some(TranscriptError::MetadataParseFailure(_)) | None => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        Self::new(status, error, format!("{err:#}"))
    }

    /// Echo the requested URL back, as n8n-style clients expect from `/clean`
    pub fn with_video_url(mut self, url: impl Into<String>) -> Self {
        self.video_url = Some(url.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// Bodies that are not JSON, lack the content type or do not fit the request shape
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Invalid request body", rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("{}: {}", self.error, self.message);
        } else {
            tracing::warn!("{}: {}", self.error, self.message);
        }

        let mut body = json!({
            "success": false,
            "error": self.error,
            "message": self.message,
        });
        if let Some(url) = self.video_url {
            body["videoUrl"] = json!(url);
        }

        (self.status, Json(body)).into_response()
    }
}
