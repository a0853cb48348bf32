// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Job posting store: attribute reads plus broadcast bookkeeping writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::JobcastError;
use crate::types::JobPosting;

/// Read access to job postings and the two bookkeeping columns the
/// broadcast pipeline owns.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Fetches a job posting by id.
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, JobcastError>;

    /// Adds one to `broadcast_count`.
    async fn increment_broadcast_count(&self, job_id: &str) -> Result<(), JobcastError>;

    /// Sets `last_broadcast_at`.
    async fn set_last_broadcast_at(
        &self,
        job_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), JobcastError>;
}
