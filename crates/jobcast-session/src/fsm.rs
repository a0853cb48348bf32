// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session connection state machine.
//!
//! ```text
//! Initializing --pairing code--> AwaitingPairing --pairing code--> AwaitingPairing
//! Initializing | AwaitingPairing --authenticated--> Connected
//! Initializing | AwaitingPairing | Connected --closed--> Initializing (reconnect)
//! Initializing --reconnect failed--> Disconnected --reconnecting--> Initializing
//! any live state --logged out--> LoggedOut (terminal)
//! ```

use chrono::{DateTime, Utc};
use jobcast_core::types::{SessionSnapshot, SessionState};

/// Inputs that drive a [`SessionFsm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionInput {
    PairingCode(String),
    Authenticated { identity: String },
    /// The transport closed without a deliberate logout.
    Dropped,
    LoggedOut,
    ReconnectFailed,
    Reconnecting,
}

/// State of one session plus the data that travels with it.
#[derive(Debug, Clone)]
pub struct SessionFsm {
    state: SessionState,
    pairing_code: Option<String>,
    identity: Option<String>,
    last_activity_at: DateTime<Utc>,
}

impl Default for SessionFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFsm {
    pub fn new() -> Self {
        Self {
            state: SessionState::Initializing,
            pairing_code: None,
            identity: None,
            last_activity_at: Utc::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pairing_code(&self) -> Option<&str> {
        self.pairing_code.as_deref()
    }

    /// Applies an input. Returns the new state, or `None` if the input is not
    /// valid in the current state and was ignored.
    pub fn apply(&mut self, input: SessionInput) -> Option<SessionState> {
        use SessionState::*;

        let next = match (self.state, input) {
            (LoggedOut, _) => return None,
            (Initializing | AwaitingPairing, SessionInput::PairingCode(code)) => {
                self.pairing_code = Some(code);
                AwaitingPairing
            }
            (Initializing | AwaitingPairing, SessionInput::Authenticated { identity }) => {
                self.identity = Some(identity);
                Connected
            }
            (Initializing | AwaitingPairing | Connected, SessionInput::Dropped) => Initializing,
            (_, SessionInput::LoggedOut) => LoggedOut,
            (Initializing, SessionInput::ReconnectFailed) => Disconnected,
            (Disconnected, SessionInput::Reconnecting) => Initializing,
            _ => return None,
        };

        if next != AwaitingPairing {
            self.pairing_code = None;
        }
        self.state = next;
        self.last_activity_at = Utc::now();
        Some(next)
    }

    pub fn snapshot(&self, session_id: &str) -> SessionSnapshot {
        SessionSnapshot {
            session_id: session_id.to_string(),
            state: self.state,
            pairing_code: self.pairing_code.clone(),
            identity: self.identity.clone(),
            last_activity_at: self.last_activity_at,
        }
    }
}
