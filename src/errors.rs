use crate::services::{gateway::GatewayError, remote::RemoteError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use tracing::warn;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::NotFound(_) => AppError::not_found(message),
            GatewayError::Validation(_) => AppError::bad_request(message),
            GatewayError::Transport(remote) => {
                warn!("remote call failed: {}", remote);
                AppError::new(remote_status(&remote), message)
            }
        }
    }
}

/// Surface the remote service's status where it is meaningful.
fn remote_status(err: &RemoteError) -> StatusCode {
    match err {
        RemoteError::Rejected { status, .. } => StatusCode::from_u16(*status)
            .ok()
            .filter(|code| code.is_client_error() || code.is_server_error())
            .unwrap_or(StatusCode::BAD_GATEWAY),
        RemoteError::NotFound(_) => StatusCode::NOT_FOUND,
        RemoteError::Conflict(_) => StatusCode::CONFLICT,
        RemoteError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        RemoteError::Malformed(_) | RemoteError::Transport(_) => StatusCode::BAD_GATEWAY,
    }
}
