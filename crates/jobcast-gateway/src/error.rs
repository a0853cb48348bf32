// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps domain errors to HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use jobcast_core::JobcastError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Present for `SessionNotReady`, so callers can tell pairing from a drop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            state: None,
        }
    }
}

/// Handler error wrapper around [`JobcastError`].
#[derive(Debug)]
pub struct ApiError(pub JobcastError);

impl From<JobcastError> for ApiError {
    fn from(e: JobcastError) -> Self {
        ApiError(e)
    }
}

pub fn status_for(e: &JobcastError) -> StatusCode {
    match e {
        JobcastError::SessionNotReady { .. } => StatusCode::CONFLICT,
        JobcastError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        JobcastError::InvalidSessionId(_)
        | JobcastError::InvalidAddress(_)
        | JobcastError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
        JobcastError::Transport { .. } | JobcastError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        JobcastError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        JobcastError::Config(_) | JobcastError::Storage { .. } | JobcastError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, %status, "request failed");
        }
        let state = match &self.0 {
            JobcastError::SessionNotReady { state, .. } => Some(state.to_string()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            state,
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobcast_core::types::SessionState;

    #[test]
    fn statuses() {
        let not_ready = JobcastError::SessionNotReady {
            session_id: "default".into(),
            state: SessionState::AwaitingPairing,
        };
        assert_eq!(status_for(&not_ready), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&JobcastError::InvalidAddress("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&JobcastError::transport("socket closed")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&JobcastError::SessionNotFound("s".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn error_response_omits_empty_state() {
        let json = serde_json::to_string(&ErrorResponse::new("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }
}
