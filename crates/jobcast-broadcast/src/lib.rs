// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job broadcast pipeline.
//!
//! Lifecycle events for job postings go through [`EventTrigger`], which
//! schedules a delayed run on the durable queue. [`BroadcastWorker`] picks
//! runs off the queue and executes them with [`BroadcastOrchestrator`] under
//! the run timeout, retrying with backoff on failure.

pub mod matching;
pub mod orchestrator;
pub mod templates;
pub mod trigger;
pub mod worker;

pub use matching::HttpMatchingService;
pub use orchestrator::{BroadcastOrchestrator, RunOutcome};
pub use trigger::{BROADCAST_QUEUE, BroadcastTask, EventTrigger};
pub use worker::{BroadcastWorker, WorkOutcome};
