// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable task queue with visibility delay and retry backoff.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JobcastError;
use crate::types::{FailOutcome, QueueEntry, QueueStats};

/// A durable queue that survives restarts.
#[async_trait]
pub trait TaskQueue: Send + Sync + 'static {
    /// Enqueues a payload that becomes visible after `delay`.
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<i64, JobcastError>;

    /// Claims the next visible entry, holding it for `lock`.
    async fn dequeue(
        &self,
        queue_name: &str,
        lock: Duration,
    ) -> Result<Option<QueueEntry>, JobcastError>;

    /// Marks an entry completed.
    async fn ack(&self, id: i64) -> Result<(), JobcastError>;

    /// Records a failed attempt. `backoff[n]` is the delay after the
    /// (n+1)-th failure; the last value repeats.
    async fn fail(
        &self,
        id: i64,
        error: &str,
        backoff: &[Duration],
    ) -> Result<FailOutcome, JobcastError>;

    /// Fails an entry at once regardless of remaining attempts.
    async fn fail_permanently(&self, id: i64, error: &str) -> Result<(), JobcastError>;

    /// Counts entries per status.
    async fn stats(&self, queue_name: &str) -> Result<QueueStats, JobcastError>;
}
