use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::extract::ExtractionError;
use crate::models::ErrorResponse;

/// Every way a `/yt` request can fail. Each variant is answered with a JSON
/// `{"error": ...}` body; none of them outlive the request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("YouTube URL is required")]
    MissingUrl,
    #[error("Invalid YouTube URL")]
    InvalidUrl,
    #[error("No download link available")]
    NoDownloadLink,
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl | RelayError::InvalidUrl => StatusCode::BAD_REQUEST,
            RelayError::NoDownloadLink => StatusCode::NOT_FOUND,
            RelayError::Connection(_) | RelayError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ExtractionError> for RelayError {
    fn from(err: ExtractionError) -> Self {
        RelayError::Connection(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
