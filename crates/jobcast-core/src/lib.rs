// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Jobcast messaging gateway.
//!
//! This crate provides the error type, the shared data model and the adapter
//! traits for the gateway's collaborators (transport, matching service, job
//! store, task queue). Everything else in the workspace builds on these.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::JobcastError;
pub use types::{
    Applicant, BroadcastRun, Credentials, InboundMessage, JobPosting, JobStatus, MessageKind,
    OutboundPayload, OutgoingMessage, SendReceipt, SendResult, SessionSnapshot, SessionState,
    TransportEvent,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    JobStore, MatchingService, TaskQueue, TransportClient, TransportConnection, TransportConnector,
};
