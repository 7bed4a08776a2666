//! Error-to-HTTP response conversion.

use crate::service::ServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hlsforge_media::Error as MediaError;
use serde_json::json;

/// Wrapper so route handlers can return `Result<T, ServiceError>` via `?`.
#[derive(Debug)]
pub struct AppError {
    inner: ServiceError,
}

impl AppError {
    pub fn new(inner: ServiceError) -> Self {
        Self { inner }
    }

    pub fn status(&self) -> StatusCode {
        match &self.inner {
            ServiceError::Media(e) if e.is_source_failure() => StatusCode::NOT_FOUND,
            ServiceError::Media(MediaError::TrackNotFound { .. })
            | ServiceError::Media(MediaError::InvalidSegmentIndex { .. }) => {
                StatusCode::NOT_IMPLEMENTED
            }
            ServiceError::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::NoSources | ServiceError::BadName(_) => StatusCode::NOT_FOUND,
            ServiceError::FileIndexOutOfRange { .. }
            | ServiceError::NoTrackSelected(_)
            | ServiceError::NoSegments(_) => StatusCode::NOT_IMPLEMENTED,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.inner {
            ServiceError::Media(e) => match e {
                MediaError::SourceUnavailable { .. } | MediaError::Io(_) => "source_unavailable",
                MediaError::MoovNotFound { .. } => "moov_not_found",
                MediaError::TrackNotFound { .. } => "track_not_found",
                MediaError::InvalidSegmentIndex { .. } => "invalid_segment",
                MediaError::Transport(_) => "transport_error",
                MediaError::InvalidMp4(_) => "invalid_media",
                MediaError::Unsupported(_) => "unsupported",
            },
            ServiceError::NoSources | ServiceError::BadName(_) => "bad_request",
            ServiceError::FileIndexOutOfRange { .. } | ServiceError::NoTrackSelected(_) => {
                "invalid_variant"
            }
            ServiceError::NoSegments(_) => "no_segments",
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.inner, "Media request failed");
        } else {
            tracing::debug!(status = %status, error = %self.inner, "Media request rejected");
        }

        let body = json!({
            "error": self.inner.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
