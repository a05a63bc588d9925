//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::client::SeriesError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Whether re-issuing the same request may succeed
    #[serde(default)]
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            retryable: false,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Resource not found
    NotFound(String),
    /// Invalid request (validation error)
    BadRequest(String),
    /// Pipeline or client error
    Series(SeriesError),
}

/// HTTP status for each series error kind.
pub fn status_for(err: &SeriesError) -> StatusCode {
    match err {
        SeriesError::NoMatch { .. } | SeriesError::NotFound { .. } => StatusCode::NOT_FOUND,
        SeriesError::Network { .. } | SeriesError::InvalidResponse { .. } => {
            StatusCode::BAD_GATEWAY
        }
        SeriesError::EmptySeries { .. } | SeriesError::DisjointSeries { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SeriesError::BaselineOutOfRange { .. } => StatusCode::BAD_REQUEST,
        SeriesError::Configuration { .. } | SeriesError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Series(e) => {
                let status = status_for(&e);
                if status.is_server_error() {
                    error!("{}", e);
                } else {
                    warn!("{}", e);
                }
                let context = e.context();
                let mut body = ApiError::new(e.code(), e.message());
                body.details = context
                    .details
                    .clone()
                    .or_else(|| context.filters.as_ref().map(|f| format!("filters: {}", f)));
                body.retryable = e.is_retryable();
                (status, body)
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        AppError::Series(err)
    }
}
