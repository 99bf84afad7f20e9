use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::handlers::ApiResponse;

/// Errors surfaced by the read-only API.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Nothing to show yet, e.g. before the first cycle finishes.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            AppError::NotFound(msg) => {
                tracing::debug!(%msg, "Resource not found");
                msg
            }
            AppError::Internal(e) => {
                tracing::error!(error = ?e, "Internal error");
                "Internal server error".to_string()
            }
        };

        (status, ApiResponse::<()>::err(message)).into_response()
    }
}
