// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Jobcast gateway.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// --- Sessions ---

/// Connection lifecycle state of a transport session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionState {
    /// Connection is being opened (or reopened after a drop).
    Initializing,
    /// Waiting for an operator to link the device with the pairing code.
    AwaitingPairing,
    /// Authenticated and able to send.
    Connected,
    /// A reconnect attempt failed; another one is scheduled.
    Disconnected,
    /// Deliberately logged out. Terminal.
    LoggedOut,
}

/// Point-in-time view of a session, safe to hand to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub state: SessionState,
    /// Present only while `AwaitingPairing`.
    pub pairing_code: Option<String>,
    /// Account identity reported by the transport once authenticated.
    pub identity: Option<String>,
    pub last_activity_at: DateTime<Utc>,
}

/// Opaque credential material produced by the transport.
///
/// The gateway never looks inside; it only persists and replays it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(pub Vec<u8>);

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credentials([redacted; {} bytes])", self.0.len())
    }
}

/// Events emitted by a transport connection.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A (new) pairing code is available for linking.
    PairingCode(String),
    /// The connection is authenticated.
    Authenticated { identity: String },
    /// The transport rotated its credentials; they must be persisted.
    CredentialsUpdated(Credentials),
    /// A message arrived.
    Inbound(InboundMessage),
    /// Delivery status for a previously sent message.
    Receipt {
        message_id: String,
        recipient: String,
        status: String,
    },
    /// The connection closed. `logged_out` is true only for a deliberate logout.
    Closed { logged_out: bool, reason: String },
}

/// A message received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: String,
    /// Sender address as reported by the transport (may carry a domain suffix).
    pub sender: String,
    /// True for echoes of messages this account sent itself.
    #[serde(default)]
    pub from_me: bool,
    /// Text body or media caption, if any.
    #[serde(default)]
    pub text: Option<String>,
    pub timestamp: DateTime<Utc>,
}

// --- Outgoing messages ---

/// Kind of outgoing message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Document,
}

/// Media attachment for image and document messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    /// Remote URL the transport fetches the media from.
    #[serde(default)]
    pub url: Option<String>,
    /// Base64-encoded inline content.
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// An immutable message addressed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMessage {
    /// Destination address before normalization.
    pub address: String,
    pub body: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default)]
    pub media: Option<MediaPayload>,
    /// Correlation tags for audit (job id, candidate id, broadcast id).
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl OutgoingMessage {
    /// Builds a plain text message.
    pub fn text(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            kind: MessageKind::Text,
            media: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Returns a copy with one more correlation tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Wire-ready payload handed to a [`TransportClient`](crate::TransportClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundPayload {
    Text {
        text: String,
    },
    Image {
        media: MediaPayload,
        caption: Option<String>,
    },
    Document {
        media: MediaPayload,
        file_name: String,
        caption: Option<String>,
    },
}

/// Successful single send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub message_id: String,
    /// Normalized recipient address.
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one send attempt inside a bulk run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResult {
    pub success: bool,
    pub message_id: Option<String>,
    pub error: Option<String>,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
    /// Position of the message in the caller's input.
    pub original_index: usize,
}

// --- Recruitment entities ---

/// Publication status of a job posting.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

/// The attributes of a job posting the broadcast pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_min: Option<i64>,
    #[serde(default)]
    pub salary_max: Option<i64>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub broadcast_enabled: bool,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub broadcast_count: i64,
    #[serde(default)]
    pub last_broadcast_at: Option<DateTime<Utc>>,
}

impl JobPosting {
    /// Published with broadcasting switched on.
    pub fn is_broadcastable(&self) -> bool {
        self.status == JobStatus::Published && self.broadcast_enabled
    }
}

/// A candidate matched to a job posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Applicant {
    pub candidate_id: String,
    pub full_name: String,
    #[serde(default)]
    pub contact_address: Option<String>,
}

impl Applicant {
    /// The contact address, if present and not blank.
    pub fn reachable_address(&self) -> Option<&str> {
        self.contact_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

/// Bookkeeping for one execution of the fan-out pipeline.
///
/// Counters are only changed through [`BroadcastRun::tally`] by the run that
/// created it, and the value is frozen by [`BroadcastRun::complete`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastRun {
    broadcast_id: String,
    job_id: String,
    recipients: usize,
    success_count: usize,
    failure_count: usize,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl BroadcastRun {
    /// Starts a run. The id is `JOB_<job id>_<epoch seconds>`.
    pub fn start(job_id: &str, recipients: usize, started_at: DateTime<Utc>) -> Self {
        Self {
            broadcast_id: format!("JOB_{job_id}_{}", started_at.timestamp()),
            job_id: job_id.to_string(),
            recipients,
            success_count: 0,
            failure_count: 0,
            started_at,
            completed_at: None,
        }
    }

    /// Counts send results. Ignored once the run is complete.
    pub fn tally(&mut self, results: &[SendResult]) {
        if self.completed_at.is_some() {
            return;
        }
        for result in results {
            if result.success {
                self.success_count += 1;
            } else {
                self.failure_count += 1;
            }
        }
    }

    /// Freezes the run.
    pub fn complete(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at.get_or_insert(at);
        self
    }

    pub fn broadcast_id(&self) -> &str {
        &self.broadcast_id
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Recipients that had a contact address.
    pub fn recipients(&self) -> usize {
        self.recipients
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn failure_count(&self) -> usize {
        self.failure_count
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

// --- Queue ---

/// A durable queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub available_at: String,
    pub locked_until: Option<String>,
    pub last_error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What happened to an entry reported as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOutcome {
    /// Back to pending, visible again after the delay.
    Retrying { attempt: i32, delay: Duration },
    /// Attempts exhausted.
    Failed { attempts: i32 },
}

/// Per-status entry counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Pending and already visible.
    pub pending: u64,
    /// Pending but not yet visible (delay or backoff).
    pub delayed: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}
