//! API error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use herald_queue::{EntryId, QueueError};
use thiserror::Error;

/// Errors from running the API server
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to bind API server to {address}: {source}")]
    BindError {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("API server error: {0}")]
    ServerError(String),
}

/// Errors a single request can end in
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Mailing {0} not found")]
    NotFound(EntryId),

    #[error("Queue error: {0}")]
    Queue(QueueError),
}

impl From<QueueError> for RequestError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound(id) => Self::NotFound(id),
            other => Self::Queue(other),
        }
    }
}

impl RequestError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, "Request rejected");
        }

        (status, self.to_string()).into_response()
    }
}
