// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory job store, matching service and queue for broadcast tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use jobcast_core::JobcastError;
use jobcast_core::traits::{JobStore, MatchingService, TaskQueue};
use jobcast_core::types::{Applicant, FailOutcome, JobPosting, QueueEntry, QueueStats};

/// Job postings held in a map.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<Mutex<HashMap<String, JobPosting>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, job: JobPosting) {
        self.jobs.lock().await.insert(job.id.clone(), job);
    }

    pub async fn job(&self, job_id: &str) -> Option<JobPosting> {
        self.jobs.lock().await.get(job_id).cloned()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, JobcastError> {
        Ok(self.job(job_id).await)
    }

    async fn increment_broadcast_count(&self, job_id: &str) -> Result<(), JobcastError> {
        if let Some(job) = self.jobs.lock().await.get_mut(job_id) {
            job.broadcast_count += 1;
        }
        Ok(())
    }

    async fn set_last_broadcast_at(
        &self,
        job_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), JobcastError> {
        if let Some(job) = self.jobs.lock().await.get_mut(job_id) {
            job.last_broadcast_at = Some(at);
        }
        Ok(())
    }
}

/// Matching service with a fixed answer.
#[derive(Clone, Default)]
pub struct StaticMatching {
    applicants: Vec<Applicant>,
    failing: bool,
    calls: Arc<Mutex<Vec<(String, usize)>>>,
}

impl StaticMatching {
    pub fn new(applicants: Vec<Applicant>) -> Self {
        Self {
            applicants,
            ..Self::default()
        }
    }

    /// A matching service that always fails with an upstream error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// `(job_id, limit)` of every call, in order.
    pub async fn calls(&self) -> Vec<(String, usize)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl MatchingService for StaticMatching {
    async fn find_matching_applicants(
        &self,
        job_id: &str,
        limit: usize,
    ) -> Result<Vec<Applicant>, JobcastError> {
        self.calls.lock().await.push((job_id.to_string(), limit));
        if self.failing {
            return Err(JobcastError::Upstream {
                message: "matching service unavailable".to_string(),
                source: None,
            });
        }
        Ok(self.applicants.iter().take(limit).cloned().collect())
    }
}

/// An enqueue captured by [`RecordingQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enqueued {
    pub queue_name: String,
    pub payload: String,
    pub delay: Duration,
    pub max_attempts: u32,
}

/// Task queue that only records enqueues; nothing is ever dequeued.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    enqueued: Arc<Mutex<Vec<Enqueued>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent enqueues fail with a storage error.
    pub fn fail_enqueues(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub async fn enqueued(&self) -> Vec<Enqueued> {
        self.enqueued.lock().await.clone()
    }
}

#[async_trait]
impl TaskQueue for RecordingQueue {
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<i64, JobcastError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(JobcastError::Storage {
                source: "queue unavailable".into(),
            });
        }
        let mut enqueued = self.enqueued.lock().await;
        enqueued.push(Enqueued {
            queue_name: queue_name.to_string(),
            payload: payload.to_string(),
            delay,
            max_attempts,
        });
        Ok(enqueued.len() as i64)
    }

    async fn dequeue(
        &self,
        _queue_name: &str,
        _lock: Duration,
    ) -> Result<Option<QueueEntry>, JobcastError> {
        Ok(None)
    }

    async fn ack(&self, _id: i64) -> Result<(), JobcastError> {
        Ok(())
    }

    async fn fail(
        &self,
        _id: i64,
        _error: &str,
        _backoff: &[Duration],
    ) -> Result<FailOutcome, JobcastError> {
        Ok(FailOutcome::Failed { attempts: 1 })
    }

    async fn fail_permanently(&self, _id: i64, _error: &str) -> Result<(), JobcastError> {
        Ok(())
    }

    async fn stats(&self, _queue_name: &str) -> Result<QueueStats, JobcastError> {
        let pending = self.enqueued.lock().await.len() as u64;
        Ok(QueueStats {
            pending,
            ..QueueStats::default()
        })
    }
}
