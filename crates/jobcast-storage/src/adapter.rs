// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed implementations of the queue and job store traits.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobcast_config::model::StorageConfig;
use jobcast_core::traits::{JobStore, TaskQueue};
use jobcast_core::types::{FailOutcome, JobPosting, QueueEntry, QueueStats};
use jobcast_core::JobcastError;
use tracing::info;

use crate::database::Database;
use crate::queries;

/// SQLite storage adapter shared by the queue worker, the trigger and the
/// HTTP gateway.
#[derive(Clone)]
pub struct SqliteStorage {
    db: Database,
}

impl SqliteStorage {
    /// Opens the database named by the storage configuration.
    pub async fn open(config: &StorageConfig) -> Result<Self, JobcastError> {
        let db = Database::open(&config.database_path).await?;
        info!(path = %config.database_path, "storage initialized");
        Ok(Self { db })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Inserts or updates a job posting mirrored from the host platform.
    pub async fn upsert_job(&self, job: &JobPosting) -> Result<(), JobcastError> {
        queries::jobs::upsert_job(&self.db, job).await
    }

    /// Removes a job posting. Returns whether it existed.
    pub async fn delete_job(&self, job_id: &str) -> Result<bool, JobcastError> {
        queries::jobs::delete_job(&self.db, job_id).await
    }

    pub async fn close(self) -> Result<(), JobcastError> {
        self.db.close().await
    }
}

#[async_trait]
impl TaskQueue for SqliteStorage {
    async fn enqueue(
        &self,
        queue_name: &str,
        payload: &str,
        delay: Duration,
        max_attempts: u32,
    ) -> Result<i64, JobcastError> {
        queries::queue::enqueue(&self.db, queue_name, payload, delay, max_attempts).await
    }

    async fn dequeue(
        &self,
        queue_name: &str,
        lock: Duration,
    ) -> Result<Option<QueueEntry>, JobcastError> {
        queries::queue::dequeue(&self.db, queue_name, lock).await
    }

    async fn ack(&self, id: i64) -> Result<(), JobcastError> {
        queries::queue::ack(&self.db, id).await
    }

    async fn fail(
        &self,
        id: i64,
        error: &str,
        backoff: &[Duration],
    ) -> Result<FailOutcome, JobcastError> {
        queries::queue::fail(&self.db, id, error, backoff).await
    }

    async fn fail_permanently(&self, id: i64, error: &str) -> Result<(), JobcastError> {
        queries::queue::fail_permanently(&self.db, id, error).await
    }

    async fn stats(&self, queue_name: &str) -> Result<QueueStats, JobcastError> {
        queries::queue::stats(&self.db, queue_name).await
    }
}

#[async_trait]
impl JobStore for SqliteStorage {
    async fn get_job(&self, job_id: &str) -> Result<Option<JobPosting>, JobcastError> {
        queries::jobs::get_job(&self.db, job_id).await
    }

    async fn increment_broadcast_count(&self, job_id: &str) -> Result<(), JobcastError> {
        queries::jobs::increment_broadcast_count(&self.db, job_id).await
    }

    async fn set_last_broadcast_at(
        &self,
        job_id: &str,
        at: DateTime<Utc>,
    ) -> Result<(), JobcastError> {
        queries::jobs::set_last_broadcast_at(&self.db, job_id, at).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_from_config_and_use_through_traits() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("jobcast.db").to_string_lossy().into_owned(),
            auth_dir: dir.path().join("auth").to_string_lossy().into_owned(),
        };
        let storage = SqliteStorage::open(&config).await.unwrap();

        let queue: Arc<dyn TaskQueue> = Arc::new(storage.clone());
        let id = queue
            .enqueue("broadcast", "{}", Duration::ZERO, 3)
            .await
            .unwrap();
        let entry = queue
            .dequeue("broadcast", Duration::from_secs(60))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.id, id);
        queue.ack(id).await.unwrap();
        assert_eq!(queue.stats("broadcast").await.unwrap().completed, 1);

        let jobs: Arc<dyn JobStore> = Arc::new(storage.clone());
        assert!(jobs.get_job("1").await.unwrap().is_none());

        storage.close().await.unwrap();
    }
}
