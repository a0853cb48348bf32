// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `jobcast serve` command implementation.
//!
//! Opens storage, wires the session manager to the bridge transport, starts
//! the broadcast worker and serves the HTTP gateway until a shutdown signal
//! arrives.

use std::sync::Arc;
use std::time::Duration;

use jobcast_broadcast::{BroadcastOrchestrator, BroadcastWorker, EventTrigger, HttpMatchingService};
use jobcast_config::JobcastConfig;
use jobcast_core::JobcastError;
use jobcast_core::traits::TransportConnector;
use jobcast_dispatch::{BulkSender, MessageDispatcher};
use jobcast_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use jobcast_prometheus::PrometheusRecorder;
use jobcast_session::{BridgeConnector, SessionManager, WebhookRelay};
use jobcast_storage::{CredentialStore, SqliteStorage};
use tracing::{error, info, warn};

use crate::shutdown;

/// How long the worker gets to finish an in-flight run after shutdown.
const WORKER_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything `serve` runs, wired together.
pub struct Components {
    pub storage: SqliteStorage,
    pub sessions: SessionManager,
    pub dispatcher: MessageDispatcher,
    pub trigger: Arc<EventTrigger>,
    pub worker: Arc<BroadcastWorker>,
}

/// Wires the domain components over an opened storage and a transport.
pub fn build_components(
    config: &JobcastConfig,
    storage: SqliteStorage,
    connector: Arc<dyn TransportConnector>,
) -> Result<Components, JobcastError> {
    let relay = WebhookRelay::new(&config.webhook)?;
    if !relay.is_enabled() {
        info!("no webhook url configured, inbound messages will only be logged");
    }

    let sessions = SessionManager::new(
        connector,
        CredentialStore::new(&config.storage.auth_dir),
        relay,
        config.session.reconnect_delay(),
    );
    let dispatcher = MessageDispatcher::new(sessions.clone(), &config.dispatch);

    let orchestrator = Arc::new(BroadcastOrchestrator::new(
        Arc::new(storage.clone()),
        Arc::new(HttpMatchingService::new(&config.matching)?),
        BulkSender::new(dispatcher.clone(), &config.dispatch),
        config.session.default_session_id.clone(),
        config.broadcast.max_recipients,
    ));
    let queue = Arc::new(storage.clone());
    let worker = Arc::new(BroadcastWorker::new(
        queue.clone(),
        orchestrator,
        &config.broadcast,
    ));
    let trigger = Arc::new(EventTrigger::new(queue, &config.broadcast));

    Ok(Components {
        storage,
        sessions,
        dispatcher,
        trigger,
        worker,
    })
}

/// Reopens persisted sessions and creates the default one if configured.
///
/// Failures are logged; the gateway still starts so operators can fix
/// sessions over HTTP.
pub async fn start_sessions(config: &JobcastConfig, sessions: &SessionManager) -> Vec<String> {
    let mut started = Vec::new();

    if config.session.restore_on_start {
        match sessions.restore_persisted().await {
            Ok(restored) => {
                info!(count = restored.len(), "persisted sessions restored");
                started = restored;
            }
            Err(e) => error!(error = %e, "failed to restore persisted sessions"),
        }
    }

    let default_id = &config.session.default_session_id;
    if config.session.auto_create_default && !started.iter().any(|id| id == default_id) {
        match sessions.create_session(default_id).await {
            Ok(snapshot) => {
                info!(session_id = %default_id, state = %snapshot.state, "default session created");
                started.push(default_id.clone());
            }
            Err(e) => warn!(session_id = %default_id, error = %e, "failed to create default session"),
        }
    }

    started
}

/// Runs the `jobcast serve` command.
pub async fn run_serve(config: JobcastConfig) -> Result<(), JobcastError> {
    init_tracing(&config.gateway.log_level);
    info!(name = %config.gateway.name, version = env!("CARGO_PKG_VERSION"), "starting jobcast");

    let prometheus = if config.server.metrics_enabled {
        Some(PrometheusRecorder::install()?)
    } else {
        None
    };
    if config.server.bearer_token.is_none() {
        warn!("server.bearer_token is not set, every /v1 request will be rejected");
    }

    let storage = SqliteStorage::open(&config.storage).await?;
    let connector: Arc<dyn TransportConnector> = Arc::new(BridgeConnector::new(
        config.session.transport_url.clone(),
        config.session.connect_timeout(),
    ));
    let components = build_components(&config, storage, connector)?;

    start_sessions(&config, &components.sessions).await;

    let cancel = shutdown::install_signal_handler();

    let worker_handle = if config.broadcast.enabled {
        let worker = components.worker.clone();
        let token = cancel.clone();
        Some(tokio::spawn(async move { worker.run(token).await }))
    } else {
        info!("broadcasting disabled, worker not started");
        None
    };

    let state = GatewayState {
        sessions: components.sessions.clone(),
        dispatcher: components.dispatcher.clone(),
        storage: components.storage.clone(),
        trigger: components.trigger.clone(),
        default_session_id: config.session.default_session_id.clone(),
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render: prometheus.map(|p| {
                Arc::new(move || p.render()) as Arc<dyn Fn() -> String + Send + Sync>
            }),
        },
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    let served = jobcast_gateway::start_server(&server_config, state, cancel.clone()).await;
    // A bind failure also has to stop the worker.
    cancel.cancel();

    if let Some(handle) = worker_handle
        && tokio::time::timeout(WORKER_DRAIN_TIMEOUT, handle).await.is_err()
    {
        warn!("broadcast worker did not stop in time");
    }

    components.sessions.shutdown().await;
    components.storage.close().await?;
    info!("jobcast stopped");
    served
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jobcast={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
