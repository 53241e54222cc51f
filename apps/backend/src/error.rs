//! Error handling for the backend API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recall_core::{ParseError, SchedulerError};
use serde::Serialize;
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Scheduler configuration error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Card not found or not reviewable")]
    CardNotReviewable,

    #[error("Invalid rating: {0}")]
    InvalidRating(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),

    #[error("Review not found")]
    ReviewNotFound,

    #[error("Cannot undo: this is not the most recent review for this card")]
    ReviewNotLatest,

    #[error("Review id already used for a different card")]
    ReviewIdConflict,

    #[error("Cannot undo: card has been deleted")]
    CardAlreadyDeleted,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::InvalidRating(value) => ApiError::InvalidRating(value),
            ParseError::InvalidMode(value) => ApiError::InvalidMode(value),
            ParseError::InvalidCardState(value) => {
                ApiError::Internal(format!("stored card state {:?} is invalid", value))
            }
        }
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::CardNotReviewable => (StatusCode::NOT_FOUND, "card_not_found"),
            ApiError::ReviewNotFound => (StatusCode::NOT_FOUND, "review_not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::InvalidRating(_) => (StatusCode::BAD_REQUEST, "invalid_rating"),
            ApiError::InvalidMode(_) => (StatusCode::BAD_REQUEST, "invalid_mode"),
            ApiError::Scheduler(_) => (StatusCode::BAD_REQUEST, "invalid_scheduler_config"),
            ApiError::ReviewNotLatest => (StatusCode::CONFLICT, "review_not_latest"),
            ApiError::ReviewIdConflict => (StatusCode::CONFLICT, "review_id_conflict"),
            ApiError::CardAlreadyDeleted => (StatusCode::GONE, "card_deleted"),
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            ApiError::Migration(_) => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for API handlers
pub type Result<T> = std::result::Result<T, ApiError>;
