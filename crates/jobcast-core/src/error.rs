// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Jobcast messaging gateway.

use thiserror::Error;

use crate::types::SessionState;

/// The primary error type used across all Jobcast adapter traits and core operations.
#[derive(Debug, Error)]
pub enum JobcastError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport errors (connection failure, rejected send, closed socket).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The session exists but is not in the `Connected` state.
    #[error("session {session_id} is not ready (state: {state})")]
    SessionNotReady {
        session_id: String,
        state: SessionState,
    },

    /// No live session with the given id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Session id is empty or contains characters outside `[A-Za-z0-9_-]`.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Destination address could not be normalized.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Message is malformed for its kind (e.g. image without media).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A collaborating service (matching service, webhook endpoint) failed.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JobcastError {
    /// Shorthand for a transport error without an underlying source.
    pub fn transport(message: impl Into<String>) -> Self {
        JobcastError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true if this error means the session was not usable for sending.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            JobcastError::SessionNotReady { .. } | JobcastError::SessionNotFound(_)
        )
    }
}
