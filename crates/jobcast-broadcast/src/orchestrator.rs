// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One broadcast run for one job posting.
//!
//! A run is a single attempt; the queue worker owns retries. Precondition
//! failures are successful no-ops. Per-recipient send failures are tallied,
//! not propagated. Anything else (store, matching service, session not
//! connected) propagates so the queue retries the run.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use jobcast_core::JobcastError;
use jobcast_core::traits::{JobStore, MatchingService};
use jobcast_core::types::{BroadcastRun, OutgoingMessage};
use jobcast_dispatch::BulkSender;

use crate::templates;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The job is missing, unpublished or has broadcasting switched off.
    Skipped { reason: String },
    /// The matching service returned nobody.
    NoRecipients,
    Completed(BroadcastRun),
}

pub struct BroadcastOrchestrator {
    jobs: Arc<dyn JobStore>,
    matching: Arc<dyn MatchingService>,
    sender: BulkSender,
    session_id: String,
    max_recipients: usize,
}

impl BroadcastOrchestrator {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        matching: Arc<dyn MatchingService>,
        sender: BulkSender,
        session_id: impl Into<String>,
        max_recipients: usize,
    ) -> Self {
        Self {
            jobs,
            matching,
            sender,
            session_id: session_id.into(),
            max_recipients,
        }
    }

    pub async fn run(&self, job_id: &str) -> Result<RunOutcome, JobcastError> {
        let Some(job) = self.jobs.get_job(job_id).await? else {
            info!(job_id, "job no longer exists, broadcast skipped");
            return Ok(RunOutcome::Skipped {
                reason: "job not found".to_string(),
            });
        };
        if !job.is_broadcastable() {
            info!(job_id, status = %job.status, broadcast_enabled = job.broadcast_enabled, "job not broadcastable, broadcast skipped");
            return Ok(RunOutcome::Skipped {
                reason: format!(
                    "status {} with broadcast {}",
                    job.status,
                    if job.broadcast_enabled { "enabled" } else { "disabled" }
                ),
            });
        }

        let applicants = self
            .matching
            .find_matching_applicants(job_id, self.max_recipients)
            .await?;
        if applicants.is_empty() {
            info!(job_id, "no matching applicants, broadcast skipped");
            return Ok(RunOutcome::NoRecipients);
        }

        let reachable: Vec<_> = applicants
            .iter()
            .filter_map(|a| a.reachable_address().map(|address| (a, address)))
            .collect();

        let mut run = BroadcastRun::start(job_id, reachable.len(), Utc::now());
        let broadcast_id = run.broadcast_id().to_string();

        let messages: Vec<OutgoingMessage> = reachable
            .iter()
            .map(|(applicant, address)| {
                OutgoingMessage::text(*address, templates::job_broadcast(&job, &applicant.full_name))
                    .with_tag("job_id", job_id)
                    .with_tag("candidate_id", applicant.candidate_id.as_str())
                    .with_tag("broadcast_id", broadcast_id.as_str())
            })
            .collect();

        if !messages.is_empty() {
            let results = self.sender.send_bulk(&self.session_id, &messages).await?;
            run.tally(&results);
        }

        self.jobs.increment_broadcast_count(job_id).await?;
        let run = run.complete(Utc::now());
        self.jobs
            .set_last_broadcast_at(job_id, run.completed_at().unwrap_or_else(Utc::now))
            .await?;

        jobcast_prometheus::record_broadcast_run(run.success_count(), run.failure_count());
        info!(
            job_id,
            broadcast_id = %run.broadcast_id(),
            matched = applicants.len(),
            recipients = run.recipients(),
            success = run.success_count(),
            failure = run.failure_count(),
            "broadcast completed"
        );
        Ok(RunOutcome::Completed(run))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use chrono::NaiveDate;
    use jobcast_config::model::DispatchConfig;
    use jobcast_core::types::{Applicant, JobPosting, JobStatus};
    use jobcast_dispatch::MessageDispatcher;
    use jobcast_session::{SessionManager, WebhookRelay};
    use jobcast_storage::CredentialStore;
    use jobcast_test_utils::{InMemoryJobStore, MockConnector, StaticMatching};

    fn job(status: JobStatus, enabled: bool) -> JobPosting {
        JobPosting {
            id: "42".into(),
            title: "Backend Engineer".into(),
            company: "Acme".into(),
            location: Some("Jakarta".into()),
            salary_min: Some(5_000_000),
            salary_max: None,
            deadline: NaiveDate::from_ymd_opt(2026, 12, 31),
            is_urgent: true,
            broadcast_enabled: enabled,
            status,
            broadcast_count: 0,
            last_broadcast_at: None,
        }
    }

    fn applicant(id: &str, address: Option<&str>) -> Applicant {
        Applicant {
            candidate_id: id.into(),
            full_name: format!("Candidate {id}"),
            contact_address: address.map(String::from),
        }
    }

    struct Fixture {
        connector: MockConnector,
        jobs: InMemoryJobStore,
        matching: StaticMatching,
        orchestrator: BroadcastOrchestrator,
        _dir: tempfile::TempDir,
    }

    async fn fixture(connector: MockConnector, applicants: Vec<Applicant>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let sessions = SessionManager::new(
            Arc::new(connector.clone()),
            CredentialStore::new(dir.path()),
            WebhookRelay::disabled(),
            Duration::from_secs(60),
        );
        sessions.create_session("default").await.unwrap();
        for _ in 0..100 {
            if sessions.connected_client("default").await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let dispatcher = MessageDispatcher::new(sessions, &DispatchConfig::default());
        let sender = BulkSender::with_delay(dispatcher, Duration::ZERO);

        let jobs = InMemoryJobStore::new();
        let matching = StaticMatching::new(applicants);
        let orchestrator = BroadcastOrchestrator::new(
            Arc::new(jobs.clone()),
            Arc::new(matching.clone()),
            sender,
            "default",
            100,
        );
        Fixture {
            connector,
            jobs,
            matching,
            orchestrator,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn completed_run_skips_recipients_without_address() {
        let f = fixture(
            MockConnector::authenticating("62811"),
            vec![
                applicant("c1", Some("0811111")),
                applicant("c2", Some("  ")),
                applicant("c3", Some("+62 822 222")),
            ],
        )
        .await;
        f.jobs.insert(job(JobStatus::Published, true)).await;

        let outcome = f.orchestrator.run("42").await.unwrap();
        let RunOutcome::Completed(run) = outcome else {
            panic!("expected a completed run");
        };
        assert_eq!(run.recipients(), 2);
        assert_eq!(run.success_count() + run.failure_count(), 2);
        assert!(run.broadcast_id().starts_with("JOB_42_"));
        assert!(run.completed_at().is_some());

        let sent = f.connector.sent_messages().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].address, "62811111");
        assert_eq!(sent[1].address, "62822222");

        let stored = f.jobs.job("42").await.unwrap();
        assert_eq!(stored.broadcast_count, 1);
        assert!(stored.last_broadcast_at.is_some());
        assert_eq!(f.matching.calls().await, vec![("42".to_string(), 100)]);
    }

    #[tokio::test]
    async fn send_failures_are_tallied_not_propagated() {
        let connector = MockConnector::authenticating("62811");
        connector.fail_sends_to("62822222").await;
        let f = fixture(
            connector,
            vec![
                applicant("c1", Some("0811111")),
                applicant("c2", Some("0822222")),
            ],
        )
        .await;
        f.jobs.insert(job(JobStatus::Published, true)).await;

        let RunOutcome::Completed(run) = f.orchestrator.run("42").await.unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(run.success_count(), 1);
        assert_eq!(run.failure_count(), 1);
    }

    #[tokio::test]
    async fn unpublished_job_sends_nothing() {
        let f = fixture(
            MockConnector::authenticating("62811"),
            vec![applicant("c1", Some("0811111"))],
        )
        .await;
        f.jobs.insert(job(JobStatus::Closed, true)).await;

        let outcome = f.orchestrator.run("42").await.unwrap();
        assert!(matches!(outcome, RunOutcome::Skipped { .. }));
        assert_eq!(f.connector.sent_count().await, 0);
        assert!(f.matching.calls().await.is_empty());
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 0);

        f.jobs.insert(job(JobStatus::Published, false)).await;
        assert!(matches!(
            f.orchestrator.run("42").await.unwrap(),
            RunOutcome::Skipped { .. }
        ));
        assert!(matches!(
            f.orchestrator.run("missing").await.unwrap(),
            RunOutcome::Skipped { .. }
        ));
        assert_eq!(f.connector.sent_count().await, 0);
    }

    #[tokio::test]
    async fn no_matches_is_a_noop() {
        let f = fixture(MockConnector::authenticating("62811"), vec![]).await;
        f.jobs.insert(job(JobStatus::Published, true)).await;

        assert_eq!(f.orchestrator.run("42").await.unwrap(), RunOutcome::NoRecipients);
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 0);
    }

    #[tokio::test]
    async fn all_recipients_unreachable_still_updates_bookkeeping() {
        let f = fixture(
            MockConnector::authenticating("62811"),
            vec![applicant("c1", None), applicant("c2", Some(""))],
        )
        .await;
        f.jobs.insert(job(JobStatus::Published, true)).await;

        let RunOutcome::Completed(run) = f.orchestrator.run("42").await.unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(run.recipients(), 0);
        assert_eq!(run.success_count() + run.failure_count(), 0);
        assert_eq!(f.connector.sent_count().await, 0);
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 1);
    }

    #[tokio::test]
    async fn disconnected_session_propagates_for_retry() {
        let f = fixture(MockConnector::new(), vec![applicant("c1", Some("0811111"))]).await;
        f.jobs.insert(job(JobStatus::Published, true)).await;

        let err = f.orchestrator.run("42").await.unwrap_err();
        assert!(err.is_not_ready());
        assert_eq!(f.jobs.job("42").await.unwrap().broadcast_count, 0);
    }

    #[tokio::test]
    async fn matching_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let sessions = SessionManager::new(
            Arc::new(connector),
            CredentialStore::new(dir.path()),
            WebhookRelay::disabled(),
            Duration::from_secs(60),
        );
        let sender = BulkSender::with_delay(
            MessageDispatcher::new(sessions, &DispatchConfig::default()),
            Duration::ZERO,
        );
        let jobs = InMemoryJobStore::new();
        jobs.insert(job(JobStatus::Published, true)).await;
        let orchestrator = BroadcastOrchestrator::new(
            Arc::new(jobs),
            Arc::new(StaticMatching::failing()),
            sender,
            "default",
            100,
        );

        let err = orchestrator.run("42").await.unwrap_err();
        assert!(matches!(err, JobcastError::Upstream { .. }));
    }
}
