// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Jobcast integration tests.
//!
//! Provides mock collaborators for fast, deterministic, CI-runnable tests
//! without a protocol sidecar, a matching service or a database.
//!
//! # Components
//!
//! - [`MockConnector`] - Scriptable transport with event injection and send capture
//! - [`InMemoryJobStore`] - Job postings and bookkeeping columns in a map
//! - [`StaticMatching`] - Matching service returning a fixed applicant list
//! - [`RecordingQueue`] - Task queue that records enqueues

pub mod mock_collaborators;
pub mod mock_transport;

pub use mock_collaborators::{Enqueued, InMemoryJobStore, RecordingQueue, StaticMatching};
pub use mock_transport::{MockConnector, SentMessage};
