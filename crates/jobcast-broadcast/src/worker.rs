// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue worker executing broadcast runs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use jobcast_config::model::BroadcastConfig;
use jobcast_core::JobcastError;
use jobcast_core::traits::TaskQueue;
use jobcast_core::types::{FailOutcome, QueueEntry};

use crate::orchestrator::BroadcastOrchestrator;
use crate::trigger::{BROADCAST_QUEUE, BroadcastTask};

/// What happened to one dequeued entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkOutcome {
    Completed,
    Retrying { attempt: i32, delay: Duration },
    Failed { attempts: i32 },
}

pub struct BroadcastWorker {
    queue: Arc<dyn TaskQueue>,
    orchestrator: Arc<BroadcastOrchestrator>,
    run_timeout: Duration,
    backoff: Vec<Duration>,
    poll_interval: Duration,
}

impl BroadcastWorker {
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        orchestrator: Arc<BroadcastOrchestrator>,
        config: &BroadcastConfig,
    ) -> Self {
        Self {
            queue,
            orchestrator,
            run_timeout: config.run_timeout(),
            backoff: config.backoff(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Polls the broadcast queue until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(poll_ms = self.poll_interval.as_millis() as u64, "broadcast worker started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let idle = match self.process_next().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    warn!(error = %e, "broadcast queue poll failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!("broadcast worker stopped");
    }

    /// Claims and processes one entry. Returns `None` when nothing is due.
    pub async fn process_next(&self) -> Result<Option<WorkOutcome>, JobcastError> {
        let Some(entry) = self.queue.dequeue(BROADCAST_QUEUE, self.run_timeout).await? else {
            return Ok(None);
        };

        let task: BroadcastTask = match serde_json::from_str(&entry.payload) {
            Ok(task) => task,
            Err(e) => {
                let reason = format!("undecodable payload: {e}");
                self.queue.fail_permanently(entry.id, &reason).await?;
                jobcast_prometheus::record_queue_outcome("failed");
                error!(queue_id = entry.id, %reason, "broadcast entry discarded");
                return Ok(Some(WorkOutcome::Failed {
                    attempts: entry.attempts + 1,
                }));
            }
        };

        debug!(queue_id = entry.id, job_id = %task.job_id, attempt = entry.attempts + 1, "running broadcast");
        let error = match tokio::time::timeout(self.run_timeout, self.orchestrator.run(&task.job_id)).await {
            Ok(Ok(_)) => {
                self.queue.ack(entry.id).await?;
                jobcast_prometheus::record_queue_outcome("completed");
                return Ok(Some(WorkOutcome::Completed));
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => JobcastError::Timeout {
                duration: self.run_timeout,
            }
            .to_string(),
        };

        let outcome = self.queue.fail(entry.id, &error, &self.backoff).await?;
        Ok(Some(match outcome {
            FailOutcome::Retrying { attempt, delay } => {
                jobcast_prometheus::record_queue_outcome("retrying");
                warn!(job_id = %task.job_id, attempt, retry_in_secs = delay.as_secs(), %error, "broadcast failed, will retry");
                WorkOutcome::Retrying { attempt, delay }
            }
            FailOutcome::Failed { attempts } => {
                jobcast_prometheus::record_queue_outcome("failed");
                on_failed(&entry, &task, attempts, &error);
                WorkOutcome::Failed { attempts }
            }
        }))
    }
}

/// Permanent failure hook. Logging only.
fn on_failed(entry: &QueueEntry, task: &BroadcastTask, attempts: i32, error: &str) {
    error!(
        queue_id = entry.id,
        job_id = %task.job_id,
        attempts,
        %error,
        "broadcast permanently failed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;
    use jobcast_config::model::DispatchConfig;
    use jobcast_core::types::{Applicant, JobPosting, JobStatus};
    use jobcast_dispatch::{BulkSender, MessageDispatcher};
    use jobcast_session::{SessionManager, WebhookRelay};
    use jobcast_storage::{CredentialStore, Database, SqliteStorage};
    use jobcast_test_utils::{InMemoryJobStore, MockConnector, StaticMatching};

    struct Fixture {
        storage: SqliteStorage,
        connector: MockConnector,
        jobs: InMemoryJobStore,
        worker: BroadcastWorker,
        _dir: tempfile::TempDir,
    }

    async fn fixture(connector: MockConnector, run_timeout: Duration) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("q.db").to_str().unwrap())
            .await
            .unwrap();
        let storage = SqliteStorage::from_database(db);

        let sessions = SessionManager::new(
            Arc::new(connector.clone()),
            CredentialStore::new(dir.path().join("auth")),
            WebhookRelay::disabled(),
            Duration::from_secs(60),
        );
        sessions.create_session("default").await.unwrap();
        for _ in 0..50 {
            if sessions.connected_client("default").await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let sender = BulkSender::with_delay(
            MessageDispatcher::new(sessions, &DispatchConfig::default()),
            Duration::ZERO,
        );

        let jobs = InMemoryJobStore::new();
        jobs.insert(JobPosting {
            id: "42".into(),
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            location: None,
            salary_min: None,
            salary_max: None,
            deadline: NaiveDate::from_ymd_opt(2026, 12, 31),
            is_urgent: false,
            broadcast_enabled: true,
            status: JobStatus::Published,
            broadcast_count: 0,
            last_broadcast_at: None,
        })
        .await;
        let matching = StaticMatching::new(vec![Applicant {
            candidate_id: "c1".into(),
            full_name: "Siti".into(),
            contact_address: Some("0811111".into()),
        }]);
        let orchestrator = Arc::new(BroadcastOrchestrator::new(
            Arc::new(jobs.clone()),
            Arc::new(matching),
            sender,
            "default",
            100,
        ));

        let config = BroadcastConfig {
            backoff_secs: vec![0],
            run_timeout_secs: 300,
            poll_interval_ms: 10,
            ..BroadcastConfig::default()
        };
        let mut worker = BroadcastWorker::new(Arc::new(storage.clone()), orchestrator, &config);
        worker.run_timeout = run_timeout;

        Fixture {
            storage,
            connector,
            jobs,
            worker,
            _dir: dir,
        }
    }

    async fn enqueue(storage: &SqliteStorage, payload: &str) -> i64 {
        storage
            .enqueue(BROADCAST_QUEUE, payload, Duration::ZERO, 3)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn successful_run_is_acked() {
        let f = fixture(MockConnector::authenticating("62811"), Duration::from_secs(300)).await;
        enqueue(&f.storage, r#"{"jobId":"42"}"#).await;

        assert_eq!(f.worker.process_next().await.unwrap(), Some(WorkOutcome::Completed));
        assert_eq!(f.worker.process_next().await.unwrap(), None);
        assert_eq!(f.storage.stats(BROADCAST_QUEUE).await.unwrap().completed, 1);
        assert_eq!(f.connector.sent_count().await, 1);
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 1);
    }

    #[tokio::test]
    async fn failing_run_retries_then_fails_permanently() {
        // Never authenticates, so every run fails with SessionNotReady.
        let f = fixture(MockConnector::new(), Duration::from_secs(300)).await;
        enqueue(&f.storage, r#"{"jobId":"42"}"#).await;

        assert!(matches!(
            f.worker.process_next().await.unwrap(),
            Some(WorkOutcome::Retrying { attempt: 1, .. })
        ));
        assert!(matches!(
            f.worker.process_next().await.unwrap(),
            Some(WorkOutcome::Retrying { attempt: 2, .. })
        ));
        assert_eq!(
            f.worker.process_next().await.unwrap(),
            Some(WorkOutcome::Failed { attempts: 3 })
        );
        assert_eq!(f.worker.process_next().await.unwrap(), None);
        assert_eq!(f.storage.stats(BROADCAST_QUEUE).await.unwrap().failed, 1);
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 0);
    }

    #[tokio::test]
    async fn run_timeout_counts_as_failure() {
        let connector = MockConnector::authenticating("62811");
        connector.set_send_delay(Duration::from_secs(5)).await;
        let f = fixture(connector, Duration::from_millis(50)).await;
        enqueue(&f.storage, r#"{"jobId":"42"}"#).await;

        assert!(matches!(
            f.worker.process_next().await.unwrap(),
            Some(WorkOutcome::Retrying { attempt: 1, .. })
        ));
    }

    #[tokio::test]
    async fn undecodable_payload_fails_at_once() {
        let f = fixture(MockConnector::authenticating("62811"), Duration::from_secs(300)).await;
        enqueue(&f.storage, "not json").await;

        assert!(matches!(
            f.worker.process_next().await.unwrap(),
            Some(WorkOutcome::Failed { .. })
        ));
        assert_eq!(f.storage.stats(BROADCAST_QUEUE).await.unwrap().failed, 1);
    }

    #[tokio::test]
    async fn run_loop_drains_queue_and_stops_on_cancel() {
        let f = fixture(MockConnector::authenticating("62811"), Duration::from_secs(300)).await;
        enqueue(&f.storage, r#"{"jobId":"42"}"#).await;

        let worker = Arc::new(f.worker);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn({
            let worker = worker.clone();
            let cancel = cancel.clone();
            async move { worker.run(cancel).await }
        });

        for _ in 0..100 {
            if f.storage.stats(BROADCAST_QUEUE).await.unwrap().completed == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(f.storage.stats(BROADCAST_QUEUE).await.unwrap().completed, 1);
    }
}
