// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end broadcast scenarios over real SQLite storage and a mock
//! transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use jobcast_broadcast::{
    BROADCAST_QUEUE, BroadcastOrchestrator, BroadcastWorker, EventTrigger, WorkOutcome,
};
use jobcast_config::model::{BroadcastConfig, DispatchConfig};
use jobcast_core::traits::{JobStore, TaskQueue};
use jobcast_core::types::{Applicant, JobPosting, JobStatus};
use jobcast_dispatch::{BulkSender, MessageDispatcher};
use jobcast_session::{SessionManager, WebhookRelay};
use jobcast_storage::{CredentialStore, Database, SqliteStorage};
use jobcast_test_utils::{MockConnector, StaticMatching};

struct Harness {
    storage: SqliteStorage,
    connector: MockConnector,
    trigger: EventTrigger,
    worker: BroadcastWorker,
    _dir: tempfile::TempDir,
}

fn posting(status: JobStatus) -> JobPosting {
    JobPosting {
        id: "1001".into(),
        title: "Warehouse Supervisor".into(),
        company: "PT Maju Jaya".into(),
        location: Some("Bekasi".into()),
        salary_min: Some(6_000_000),
        salary_max: Some(9_000_000),
        deadline: NaiveDate::from_ymd_opt(2026, 11, 30),
        is_urgent: false,
        broadcast_enabled: true,
        status,
        broadcast_count: 0,
        last_broadcast_at: None,
    }
}

async fn harness(applicants: Vec<Applicant>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(dir.path().join("jobcast.db").to_str().unwrap())
        .await
        .unwrap();
    let storage = SqliteStorage::from_database(db);

    let connector = MockConnector::authenticating("62811000000");
    let sessions = SessionManager::new(
        Arc::new(connector.clone()),
        CredentialStore::new(dir.path().join("auth")),
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

    let sender = BulkSender::with_delay(
        MessageDispatcher::new(sessions, &DispatchConfig::default()),
        Duration::ZERO,
    );
    let orchestrator = Arc::new(BroadcastOrchestrator::new(
        Arc::new(storage.clone()),
        Arc::new(StaticMatching::new(applicants)),
        sender,
        "default",
        100,
    ));

    let config = BroadcastConfig {
        trigger_delay_secs: 0,
        ..BroadcastConfig::default()
    };
    let queue: Arc<dyn TaskQueue> = Arc::new(storage.clone());
    Harness {
        trigger: EventTrigger::new(queue.clone(), &config),
        worker: BroadcastWorker::new(queue, orchestrator, &config),
        storage,
        connector,
        _dir: dir,
    }
}

fn applicant(id: &str, address: Option<&str>) -> Applicant {
    Applicant {
        candidate_id: id.into(),
        full_name: format!("Kandidat {id}"),
        contact_address: address.map(String::from),
    }
}

#[tokio::test]
async fn published_job_broadcasts_to_addressed_matches() {
    let h = harness(vec![
        applicant("c1", Some("081234500001")),
        applicant("c2", None),
        applicant("c3", Some("+62 812-3450-0003")),
    ])
    .await;

    let job = posting(JobStatus::Published);
    h.storage.upsert_job(&job).await.unwrap();
    assert!(h.trigger.on_created(&job).await);

    assert_eq!(h.worker.process_next().await.unwrap(), Some(WorkOutcome::Completed));

    let sent = h.connector.sent_messages().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].address, "6281234500001");
    assert_eq!(sent[1].address, "6281234500003");

    let stored = h.storage.get_job("1001").await.unwrap().unwrap();
    assert_eq!(stored.broadcast_count, 1);
    assert!(stored.last_broadcast_at.is_some());

    let stats = h.storage.stats(BROADCAST_QUEUE).await.unwrap();
    assert_eq!(stats.completed, 1);
}

#[tokio::test]
async fn draft_then_published_schedules_exactly_one_run() {
    let h = harness(vec![applicant("c1", Some("081234500001"))]).await;

    let draft = posting(JobStatus::Draft);
    h.storage.upsert_job(&draft).await.unwrap();
    assert!(!h.trigger.on_created(&draft).await);
    assert_eq!(h.worker.process_next().await.unwrap(), None);

    let published = posting(JobStatus::Published);
    h.storage.upsert_job(&published).await.unwrap();
    assert!(h.trigger.on_updated(Some(JobStatus::Draft), &published).await);
    // A later edit that keeps it published does not schedule again.
    assert!(
        !h.trigger
            .on_updated(Some(JobStatus::Published), &published)
            .await
    );

    assert_eq!(h.worker.process_next().await.unwrap(), Some(WorkOutcome::Completed));
    assert_eq!(h.worker.process_next().await.unwrap(), None);
    assert_eq!(h.connector.sent_count().await, 1);
    assert_eq!(
        h.storage.get_job("1001").await.unwrap().unwrap().broadcast_count,
        1
    );
}

#[tokio::test]
async fn job_closed_before_run_sends_nothing() {
    let h = harness(vec![applicant("c1", Some("081234500001"))]).await;

    let job = posting(JobStatus::Published);
    h.storage.upsert_job(&job).await.unwrap();
    assert!(h.trigger.on_created(&job).await);

    h.storage.upsert_job(&posting(JobStatus::Closed)).await.unwrap();
    assert_eq!(h.worker.process_next().await.unwrap(), Some(WorkOutcome::Completed));
    assert_eq!(h.connector.sent_count().await, 0);
    assert_eq!(
        h.storage.get_job("1001").await.unwrap().unwrap().broadcast_count,
        0
    );
}
