//! Error handling.

use axum::{
    extract::rejection::JsonRejection,
    http::header,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{event, Level};

/// Message returned to clients for faults whose detail must stay server-side.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong!";

/// Student performance service error type
///
/// This type encapsulates the various errors that may occur.
/// Each variant may result in a different API error response.
#[derive(Debug, Error)]
pub enum StudentPerfError {
    /// Required request input is missing or invalid
    #[error("{0}")]
    Validation(String),

    /// Error deserialising a request body
    #[error("{}", .0.body_text())]
    JsonRejection(#[from] JsonRejection),

    /// No student has the requested id
    #[error("Student not found")]
    NotFound,

    /// Error reported by the SQLite engine
    #[error(transparent)]
    Storage(#[from] rusqlite::Error),

    /// A previous holder of the storage connection panicked
    #[error("storage connection lock poisoned")]
    ConnectionPoisoned,

    /// A blocking storage task failed to complete
    #[error("storage task failed")]
    BlockingTask(#[from] JoinError),

    /// Error reading ingestion input
    #[error("failed to read ingestion input")]
    Io(#[from] std::io::Error),

    /// Error parsing CSV ingestion input
    #[error("failed to parse CSV input")]
    Csv(#[from] csv::Error),

    /// CSV header that does not name a column of the Student table
    #[error("unknown column {column} in CSV header")]
    UnknownColumn { column: String },

    /// CSV header that names the same column twice
    #[error("duplicate column {column} in CSV header")]
    DuplicateColumn { column: String },
}

impl IntoResponse for StudentPerfError {
    /// Convert from a `StudentPerfError` into an [axum::response::Response].
    fn into_response(self) -> Response {
        ErrorResponse::from(self).into_response()
    }
}

/// A response to send in error cases
///
/// Implements serde (de)serialise.
#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct ErrorResponse {
    /// HTTP status of the response
    #[serde(skip)]
    status: StatusCode,

    /// Error message
    pub(crate) error: String,
}

impl ErrorResponse {
    /// Return a new ErrorResponse
    ///
    /// # Arguments
    ///
    /// * `status`: HTTP status of the response
    /// * `error`: The error that occurred. Its display text becomes the message.
    fn new<E>(status: StatusCode, error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        ErrorResponse {
            status,
            error: error.to_string(),
        }
    }

    /// Return a 400 bad request ErrorResponse
    fn bad_request<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::BAD_REQUEST, error)
    }

    /// Return a 404 not found ErrorResponse
    fn not_found<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::NOT_FOUND, error)
    }

    /// Return a 500 internal server error ErrorResponse
    fn internal_server_error<E>(error: &E) -> Self
    where
        E: std::error::Error + Send + Sync,
    {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error)
    }

    /// Return a 500 internal server error ErrorResponse with a generic message.
    pub(crate) fn unhandled() -> Self {
        ErrorResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: GENERIC_ERROR_MESSAGE.to_string(),
        }
    }
}

impl From<StudentPerfError> for ErrorResponse {
    /// Convert from a `StudentPerfError` into an `ErrorResponse`.
    fn from(error: StudentPerfError) -> Self {
        let response = match &error {
            // Bad request
            StudentPerfError::Validation(_) | StudentPerfError::JsonRejection(_) => {
                Self::bad_request(&error)
            }

            // Not found
            StudentPerfError::NotFound => Self::not_found(&error),

            // Internal server error. SQLite messages are passed through to the client.
            StudentPerfError::Storage(_) => Self::internal_server_error(&error),

            // Internal server error, detail only in the log.
            StudentPerfError::ConnectionPoisoned
            | StudentPerfError::BlockingTask(_)
            | StudentPerfError::Io(_)
            | StudentPerfError::Csv(_)
            | StudentPerfError::UnknownColumn { column: _ }
            | StudentPerfError::DuplicateColumn { column: _ } => Self::unhandled(),
        };

        // Log server errors.
        if response.status.is_server_error() {
            event!(Level::ERROR, "{}", error.to_string());
            let mut current = error.source();
            while let Some(source) = current {
                event!(Level::ERROR, "Caused by: {}", source.to_string());
                current = source.source();
            }
        }

        response
    }
}

impl IntoResponse for ErrorResponse {
    /// Convert from an `ErrorResponse` into an `axum::response::Response`.
    ///
    /// Renders the response as JSON.
    fn into_response(self) -> Response {
        let json_body = serde_json::to_string(&self);
        match json_body {
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to serialise error response: {}", err),
            )
                .into_response(),
            Ok(json_body) => (
                self.status,
                [(&header::CONTENT_TYPE, mime::APPLICATION_JSON.to_string())],
                json_body,
            )
                .into_response(),
        }
    }
}
