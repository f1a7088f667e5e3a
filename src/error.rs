//! Request-level errors.
//!
//! Handlers that can fail return `Result<T, AppError>`. Backend failures on
//! reads never reach this type: the query layer has already degraded them.
//! Admin form failures are rendered as pages by their handlers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::views::NotFoundView;

#[derive(Debug, Error)]
pub enum AppError {
    /// Unknown path or missing record. Rendered as a `NotFoundView`.
    #[error("Not found: {}", .0.title)]
    NotFound(NotFoundView),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound(view) => {
                tracing::debug!(title = %view.title, "not found");
                (StatusCode::NOT_FOUND, Json(view)).into_response()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
