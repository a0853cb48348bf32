// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Candidate matching collaborator.

use async_trait::async_trait;

use crate::error::JobcastError;
use crate::types::Applicant;

/// Resolves the audience of a job broadcast.
#[async_trait]
pub trait MatchingService: Send + Sync + 'static {
    /// Returns at most `limit` applicants matching the job, best match first.
    async fn find_matching_applicants(
        &self,
        job_id: &str,
        limit: usize,
    ) -> Result<Vec<Applicant>, JobcastError>;
}
