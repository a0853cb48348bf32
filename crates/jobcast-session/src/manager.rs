// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live session registry and per-session event drivers.
//!
//! Every session gets one driver task that consumes its transport event
//! channel, so events for a session are handled strictly one at a time.
//! The registry itself sits behind a single async mutex owned here; no other
//! component touches it. Lock order is registry, then session slot. Neither
//! lock is held while a transport connects.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jobcast_core::JobcastError;
use jobcast_core::traits::{TransportClient, TransportConnector};
use jobcast_core::types::{SessionSnapshot, SessionState, TransportEvent};
use jobcast_storage::CredentialStore;

use crate::fsm::{SessionFsm, SessionInput};
use crate::relay::WebhookRelay;

/// Checks that a session id is safe to use as a file name.
pub fn validate_session_id(session_id: &str) -> Result<(), JobcastError> {
    let valid = !session_id.is_empty()
        && session_id.len() <= 64
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(JobcastError::InvalidSessionId(session_id.to_string()))
    }
}

struct SessionSlot {
    fsm: SessionFsm,
    client: Option<Arc<dyn TransportClient>>,
}

struct SessionHandle {
    session_id: String,
    slot: Mutex<SessionSlot>,
    cancel: CancellationToken,
}

impl SessionHandle {
    async fn snapshot(&self) -> SessionSnapshot {
        self.slot.lock().await.fsm.snapshot(&self.session_id)
    }

    async fn apply(&self, input: SessionInput) -> Option<SessionState> {
        let next = self.slot.lock().await.fsm.apply(input);
        if let Some(state) = next {
            debug!(session_id = %self.session_id, %state, "session state changed");
        }
        next
    }

    /// Stores a freshly opened client, or closes it if the session was
    /// cancelled while connecting. Returns whether the client was kept.
    ///
    /// Cancellation is checked under the slot lock: a concurrent close either
    /// finds the client in the slot or is seen here.
    async fn attach(&self, client: Arc<dyn TransportClient>) -> bool {
        let mut slot = self.slot.lock().await;
        if self.cancel.is_cancelled() {
            drop(slot);
            client.close().await;
            return false;
        }
        slot.fsm.apply(SessionInput::Reconnecting);
        slot.client = Some(client);
        true
    }

    /// Cancels the driver and closes the connection without logging out.
    async fn close(&self) {
        self.cancel.cancel();
        let client = self.slot.lock().await.client.take();
        if let Some(client) = client {
            client.close().await;
        }
    }
}

#[derive(Default)]
struct Registry {
    live: HashMap<String, Arc<SessionHandle>>,
    /// Ids whose session logged out. Sends report `LoggedOut` until the id
    /// is created or deleted again.
    logged_out: HashSet<String>,
}

impl Registry {
    /// Removes `handle` if it is still the registered one.
    fn remove_handle(&mut self, handle: &Arc<SessionHandle>) -> bool {
        let registered = self
            .live
            .get(&handle.session_id)
            .is_some_and(|current| Arc::ptr_eq(current, handle));
        if registered {
            self.live.remove(&handle.session_id);
            jobcast_prometheus::set_live_sessions(self.live.len());
        }
        registered
    }
}

struct Inner {
    connector: Arc<dyn TransportConnector>,
    credentials: CredentialStore,
    relay: WebhookRelay,
    reconnect_delay: Duration,
    sessions: Mutex<Registry>,
}

impl Inner {
    async fn unregister(&self, handle: &Arc<SessionHandle>) {
        self.sessions.lock().await.remove_handle(handle);
    }

    /// Drops a logged-out session from the live set and remembers its id.
    async fn retire_logged_out(&self, handle: &Arc<SessionHandle>) {
        let mut registry = self.sessions.lock().await;
        if registry.remove_handle(handle) {
            registry.logged_out.insert(handle.session_id.clone());
        }
    }
}

/// Owns every live session.
///
/// Cheap to clone; clones share the registry.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn TransportConnector>,
        credentials: CredentialStore,
        relay: WebhookRelay,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                credentials,
                relay,
                reconnect_delay,
                sessions: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Returns the existing session unchanged, or registers a new one and
    /// opens its transport connection, resuming from stored credentials.
    ///
    /// A failed first connect leaves the session registered as
    /// `Disconnected` and hands it to the reconnect loop.
    pub async fn create_session(&self, session_id: &str) -> Result<SessionSnapshot, JobcastError> {
        validate_session_id(session_id)?;

        // The placeholder makes concurrent creates for this id return early.
        let handle = {
            let mut registry = self.inner.sessions.lock().await;
            let existing = registry.live.get(session_id).cloned();
            if let Some(existing) = existing {
                drop(registry);
                return Ok(existing.snapshot().await);
            }
            let handle = Arc::new(SessionHandle {
                session_id: session_id.to_string(),
                slot: Mutex::new(SessionSlot {
                    fsm: SessionFsm::new(),
                    client: None,
                }),
                cancel: CancellationToken::new(),
            });
            registry.logged_out.remove(session_id);
            registry.live.insert(session_id.to_string(), handle.clone());
            jobcast_prometheus::set_live_sessions(registry.live.len());
            handle
        };

        let credentials = match self.inner.credentials.load(session_id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                self.inner.unregister(&handle).await;
                return Err(e);
            }
        };
        let resumed = credentials.is_some();

        match self.inner.connector.connect(session_id, credentials).await {
            Ok(conn) => {
                if handle.attach(conn.client).await {
                    tokio::spawn(drive(self.inner.clone(), handle.clone(), Some(conn.events)));
                    info!(session_id, resumed, "session created");
                } else {
                    debug!(session_id, "session removed while connecting");
                }
            }
            Err(e) => {
                handle.apply(SessionInput::ReconnectFailed).await;
                warn!(
                    session_id,
                    error = %e,
                    delay_secs = self.inner.reconnect_delay.as_secs_f64(),
                    "initial connect failed, reconnect scheduled"
                );
                tokio::spawn(drive(self.inner.clone(), handle.clone(), None));
            }
        }

        Ok(handle.snapshot().await)
    }

    /// Snapshot of a live session, including the pairing code while
    /// awaiting pairing.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionSnapshot> {
        let handle = self.inner.sessions.lock().await.live.get(session_id).cloned();
        match handle {
            Some(handle) => Some(handle.snapshot().await),
            None => None,
        }
    }

    /// Snapshots of all live sessions, ordered by id.
    pub async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let handles: Vec<Arc<SessionHandle>> =
            self.inner.sessions.lock().await.live.values().cloned().collect();
        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            snapshots.push(handle.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        snapshots
    }

    /// Logs the session out (best effort) and removes its in-memory and
    /// on-disk state. Returns whether a live session existed.
    pub async fn delete_session(&self, session_id: &str) -> Result<bool, JobcastError> {
        validate_session_id(session_id)?;

        let removed = {
            let mut registry = self.inner.sessions.lock().await;
            registry.logged_out.remove(session_id);
            let removed = registry.live.remove(session_id);
            jobcast_prometheus::set_live_sessions(registry.live.len());
            removed
        };

        if let Some(handle) = &removed {
            handle.cancel.cancel();
            let client = handle.slot.lock().await.client.take();
            if let Some(client) = client {
                if let Err(e) = client.logout().await {
                    warn!(session_id, error = %e, "logout failed during delete");
                }
                client.close().await;
            }
        }
        self.inner.credentials.remove(session_id).await?;

        info!(session_id, existed = removed.is_some(), "session deleted");
        Ok(removed.is_some())
    }

    /// Deletes and re-creates a session. The new session starts pairing from
    /// scratch because delete discards the stored credentials.
    pub async fn restart_session(&self, session_id: &str) -> Result<SessionSnapshot, JobcastError> {
        self.delete_session(session_id).await?;
        self.create_session(session_id).await
    }

    /// Re-creates every session with stored credentials. Returns the ids
    /// that were restored; failures are logged and skipped.
    pub async fn restore_persisted(&self) -> Result<Vec<String>, JobcastError> {
        let mut restored = Vec::new();
        for session_id in self.inner.credentials.list_sessions().await? {
            if validate_session_id(&session_id).is_err() {
                warn!(%session_id, "ignoring credential file with invalid session id");
                continue;
            }
            match self.create_session(&session_id).await {
                Ok(_) => restored.push(session_id),
                Err(e) => warn!(%session_id, error = %e, "failed to restore session"),
            }
        }
        info!(count = restored.len(), "persisted sessions restored");
        Ok(restored)
    }

    /// The transport client of a connected session.
    ///
    /// A session that logged out keeps failing with `SessionNotReady` in the
    /// `LoggedOut` state until it is created again.
    pub async fn connected_client(
        &self,
        session_id: &str,
    ) -> Result<Arc<dyn TransportClient>, JobcastError> {
        let handle = {
            let registry = self.inner.sessions.lock().await;
            match registry.live.get(session_id) {
                Some(handle) => handle.clone(),
                None if registry.logged_out.contains(session_id) => {
                    return Err(JobcastError::SessionNotReady {
                        session_id: session_id.to_string(),
                        state: SessionState::LoggedOut,
                    });
                }
                None => return Err(JobcastError::SessionNotFound(session_id.to_string())),
            }
        };

        let slot = handle.slot.lock().await;
        match (&slot.client, slot.fsm.state()) {
            (Some(client), SessionState::Connected) => Ok(client.clone()),
            (_, state) => Err(JobcastError::SessionNotReady {
                session_id: session_id.to_string(),
                state,
            }),
        }
    }

    /// Closes every live connection without logging out, so stored
    /// credentials stay valid for the next start.
    pub async fn shutdown(&self) {
        let handles: Vec<Arc<SessionHandle>> = {
            let mut registry = self.inner.sessions.lock().await;
            let handles = registry.live.drain().map(|(_, h)| h).collect();
            jobcast_prometheus::set_live_sessions(0);
            handles
        };
        for handle in &handles {
            handle.close().await;
        }
        info!(count = handles.len(), "sessions closed");
    }
}

enum Flow {
    Continue,
    Reconnect,
    Stop,
}

/// Consumes one session's transport events until cancelled or logged out.
/// Without an initial event channel it starts in the reconnect loop.
async fn drive(
    inner: Arc<Inner>,
    handle: Arc<SessionHandle>,
    events: Option<mpsc::Receiver<TransportEvent>>,
) {
    let events = match events {
        Some(events) => Some(events),
        None => reconnect(&inner, &handle).await,
    };
    let Some(mut events) = events else {
        debug!(session_id = %handle.session_id, "session driver stopped");
        return;
    };

    loop {
        let event = tokio::select! {
            _ = handle.cancel.cancelled() => break,
            event = events.recv() => event,
        };
        let event = event.unwrap_or_else(|| TransportEvent::Closed {
            logged_out: false,
            reason: "event stream ended".to_string(),
        });

        match handle_event(&inner, &handle, event).await {
            Flow::Continue => {}
            Flow::Stop => break,
            Flow::Reconnect => match reconnect(&inner, &handle).await {
                Some(next) => events = next,
                None => break,
            },
        }
    }
    debug!(session_id = %handle.session_id, "session driver stopped");
}

async fn handle_event(inner: &Inner, handle: &Arc<SessionHandle>, event: TransportEvent) -> Flow {
    let session_id = handle.session_id.as_str();
    match event {
        TransportEvent::PairingCode(code) => {
            if handle.apply(SessionInput::PairingCode(code)).await.is_some() {
                info!(session_id, "pairing code available");
            }
        }
        TransportEvent::Authenticated { identity } => {
            if handle
                .apply(SessionInput::Authenticated {
                    identity: identity.clone(),
                })
                .await
                .is_some()
            {
                info!(session_id, %identity, "session connected");
            }
        }
        TransportEvent::CredentialsUpdated(credentials) => {
            if let Err(e) = inner.credentials.save(session_id, &credentials).await {
                warn!(session_id, error = %e, "failed to persist credentials");
            }
        }
        TransportEvent::Inbound(msg) => {
            jobcast_prometheus::record_inbound(session_id);
            let connected = handle.slot.lock().await.fsm.state() == SessionState::Connected;
            if connected && !msg.from_me {
                inner.relay.relay(session_id, &msg).await;
            }
        }
        TransportEvent::Receipt {
            message_id,
            recipient,
            status,
        } => {
            debug!(session_id, %message_id, %recipient, %status, "delivery receipt");
        }
        TransportEvent::Closed {
            logged_out: true,
            reason,
        } => {
            handle.apply(SessionInput::LoggedOut).await;
            handle.slot.lock().await.client = None;
            inner.retire_logged_out(handle).await;
            if let Err(e) = inner.credentials.remove(session_id).await {
                warn!(session_id, error = %e, "failed to remove credentials after logout");
            }
            info!(session_id, %reason, "session logged out");
            return Flow::Stop;
        }
        TransportEvent::Closed {
            logged_out: false,
            reason,
        } => {
            handle.apply(SessionInput::Dropped).await;
            handle.slot.lock().await.client = None;
            warn!(
                session_id,
                %reason,
                delay_secs = inner.reconnect_delay.as_secs_f64(),
                "connection closed, reconnect scheduled"
            );
            return Flow::Reconnect;
        }
    }
    Flow::Continue
}

/// Retries the connection on a fixed delay until it opens or the session is
/// cancelled. Returns the new event channel.
async fn reconnect(
    inner: &Inner,
    handle: &Arc<SessionHandle>,
) -> Option<mpsc::Receiver<TransportEvent>> {
    let session_id = handle.session_id.as_str();
    loop {
        tokio::select! {
            _ = handle.cancel.cancelled() => return None,
            _ = tokio::time::sleep(inner.reconnect_delay) => {}
        }

        let credentials = match inner.credentials.load(session_id).await {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(session_id, error = %e, "failed to load credentials for reconnect");
                None
            }
        };

        match inner.connector.connect(session_id, credentials).await {
            Ok(conn) => {
                if !handle.attach(conn.client).await {
                    return None;
                }
                info!(session_id, "transport reconnected");
                return Some(conn.events);
            }
            Err(e) => {
                handle.apply(SessionInput::ReconnectFailed).await;
                warn!(session_id, error = %e, "reconnect failed, retrying");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobcast_core::types::{Credentials, InboundMessage, OutboundPayload};
    use jobcast_test_utils::MockConnector;
    use tempfile::TempDir;

    const DELAY: Duration = Duration::from_millis(50);

    fn manager(connector: &MockConnector, dir: &TempDir) -> SessionManager {
        SessionManager::new(
            Arc::new(connector.clone()),
            CredentialStore::new(dir.path()),
            WebhookRelay::disabled(),
            DELAY,
        )
    }

    /// Polls until the session reaches `state` or a second elapses.
    async fn wait_for_state(manager: &SessionManager, id: &str, state: SessionState) -> bool {
        for _ in 0..100 {
            if manager.get_session(id).await.map(|s| s.state) == Some(state) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn session_id_validation() {
        assert!(validate_session_id("default").is_ok());
        assert!(validate_session_id("hr-team_2").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc").is_err());
        assert!(validate_session_id("a b").is_err());
    }

    #[tokio::test]
    async fn create_session_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);

        let first = manager.create_session("default").await.unwrap();
        assert_eq!(first.state, SessionState::Initializing);
        let second = manager.create_session("default").await.unwrap();
        assert_eq!(second.state, SessionState::Initializing);
        assert_eq!(connector.connect_count(), 1);

        connector
            .emit("default", TransportEvent::Authenticated { identity: "62811".into() })
            .await;
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        manager.create_session("default").await.unwrap();
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_creates_open_one_connection() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);

        let (a, b) = tokio::join!(
            manager.create_session("default"),
            manager.create_session("default")
        );
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(manager.list_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn pairing_code_visible_while_awaiting_pairing() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        connector
            .emit("default", TransportEvent::PairingCode("2@qr-data".into()))
            .await;
        assert!(wait_for_state(&manager, "default", SessionState::AwaitingPairing).await);

        let snap = manager.get_session("default").await.unwrap();
        assert_eq!(snap.pairing_code.as_deref(), Some("2@qr-data"));
    }

    #[tokio::test]
    async fn send_on_initializing_session_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        let err = manager.connected_client("default").await.err().unwrap();
        assert!(matches!(
            err,
            JobcastError::SessionNotReady {
                state: SessionState::Initializing,
                ..
            }
        ));
        assert!(matches!(
            manager.connected_client("missing").await.err().unwrap(),
            JobcastError::SessionNotFound(_)
        ));
        assert_eq!(connector.sent_count().await, 0);
    }

    #[tokio::test]
    async fn unexpected_close_reconnects_after_delay() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);

        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: false,
                    reason: "stream error".into(),
                },
            )
            .await;

        // The mock authenticates every new connection, so the session comes back.
        for _ in 0..100 {
            if connector.connect_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(connector.connect_count(), 2);
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        assert!(manager.connected_client("default").await.is_ok());
    }

    #[tokio::test]
    async fn close_returns_to_initializing_before_reconnect() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = SessionManager::new(
            Arc::new(connector.clone()),
            CredentialStore::new(dir.path()),
            WebhookRelay::disabled(),
            Duration::from_secs(60),
        );

        manager.create_session("default").await.unwrap();
        connector
            .emit("default", TransportEvent::Authenticated { identity: "62811".into() })
            .await;
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: false,
                    reason: "stream error".into(),
                },
            )
            .await;
        assert!(wait_for_state(&manager, "default", SessionState::Initializing).await);
        assert_eq!(connector.connect_count(), 1);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn failed_reconnect_reports_disconnected_then_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);

        connector.fail_next_connects(1);
        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: false,
                    reason: "stream error".into(),
                },
            )
            .await;

        assert!(wait_for_state(&manager, "default", SessionState::Disconnected).await);
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        assert_eq!(connector.connect_count(), 3);
    }

    #[tokio::test]
    async fn logout_is_terminal_and_removes_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);
        let store = CredentialStore::new(dir.path());

        manager.create_session("default").await.unwrap();
        connector
            .emit(
                "default",
                TransportEvent::CredentialsUpdated(Credentials(b"blob".to_vec())),
            )
            .await;
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        for _ in 0..100 {
            if store.load("default").await.unwrap().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(store.load("default").await.unwrap().is_some());

        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: true,
                    reason: "logged out from phone".into(),
                },
            )
            .await;
        for _ in 0..100 {
            if manager.get_session("default").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(manager.get_session("default").await.is_none());
        assert!(store.load("default").await.unwrap().is_none());

        // No reconnect after logout; sends keep failing as not ready.
        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(connector.connect_count(), 1);
        assert!(matches!(
            manager.connected_client("default").await.err().unwrap(),
            JobcastError::SessionNotReady {
                state: SessionState::LoggedOut,
                ..
            }
        ));

        // A fresh create brings the id back.
        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        assert!(manager.connected_client("default").await.is_ok());
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn delete_forgets_logged_out_session() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: true,
                    reason: "logged out from phone".into(),
                },
            )
            .await;
        for _ in 0..100 {
            if manager.get_session("default").await.is_none() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert!(!manager.delete_session("default").await.unwrap());
        assert!(matches!(
            manager.connected_client("default").await.err().unwrap(),
            JobcastError::SessionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn slow_connect_does_not_block_other_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("fast").await.unwrap();
        assert!(wait_for_state(&manager, "fast", SessionState::Connected).await);

        connector
            .set_connect_delay("slow", Duration::from_secs(5))
            .await;
        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.create_session("slow").await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let client = tokio::time::timeout(
            Duration::from_millis(500),
            manager.connected_client("fast"),
        )
        .await
        .expect("registry stayed locked during connect");
        assert!(client.is_ok());

        let sessions = tokio::time::timeout(Duration::from_millis(500), manager.list_sessions())
            .await
            .unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[1].session_id, "slow");
        assert_eq!(sessions[1].state, SessionState::Initializing);

        // A second create for the connecting id returns the placeholder.
        let again = tokio::time::timeout(
            Duration::from_millis(500),
            manager.create_session("slow"),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(again.state, SessionState::Initializing);
        assert_eq!(connector.connect_count(), 2);

        pending.abort();
    }

    #[tokio::test]
    async fn failed_first_connect_enters_reconnect_loop() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        connector.fail_next_connects(1);
        let snap = manager.create_session("default").await.unwrap();
        assert_eq!(snap.state, SessionState::Disconnected);
        assert!(matches!(
            manager.connected_client("default").await.err().unwrap(),
            JobcastError::SessionNotReady {
                state: SessionState::Disconnected,
                ..
            }
        ));

        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);
        assert_eq!(connector.connect_count(), 2);
        assert!(manager.connected_client("default").await.is_ok());
    }

    #[tokio::test]
    async fn restart_during_reconnect_leaves_one_connection() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);

        connector
            .set_connect_delay("default", Duration::from_millis(200))
            .await;
        connector
            .emit(
                "default",
                TransportEvent::Closed {
                    logged_out: false,
                    reason: "stream error".into(),
                },
            )
            .await;
        for _ in 0..100 {
            if connector.connect_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(connector.connect_count(), 2);

        // The reconnect is still inside connect.
        manager.restart_session("default").await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(connector.connect_count(), 3);
        assert_eq!(connector.close_count(), 1);
        assert_eq!(manager.list_sessions().await.len(), 1);
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);

        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(connector.connect_count(), 3);
    }

    #[tokio::test]
    async fn delete_logs_out_and_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        assert!(manager.delete_session("default").await.unwrap());
        assert_eq!(connector.logout_count(), 1);
        assert!(manager.get_session("default").await.is_none());
        assert!(!manager.delete_session("default").await.unwrap());

        tokio::time::sleep(DELAY * 3).await;
        assert_eq!(connector.connect_count(), 1);
    }

    #[tokio::test]
    async fn restart_opens_a_fresh_connection() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);

        manager.create_session("default").await.unwrap();
        let snap = manager.restart_session("default").await.unwrap();
        assert_eq!(snap.state, SessionState::Initializing);
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(manager.list_sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn restore_persisted_resumes_with_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        store.save("alpha", &Credentials(b"a".to_vec())).await.unwrap();
        store.save("beta", &Credentials(b"b".to_vec())).await.unwrap();

        let connector = MockConnector::new();
        let manager = manager(&connector, &dir);
        let restored = manager.restore_persisted().await.unwrap();
        assert_eq!(restored, vec!["alpha", "beta"]);

        let seen = connector.credentials_seen().await;
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("alpha".to_string(), Some(Credentials(b"a".to_vec()))));
    }

    #[tokio::test]
    async fn shutdown_closes_without_logout() {
        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let manager = manager(&connector, &dir);

        manager.create_session("a").await.unwrap();
        manager.create_session("b").await.unwrap();
        manager.shutdown().await;

        assert!(manager.list_sessions().await.is_empty());
        assert_eq!(connector.close_count(), 2);
        assert_eq!(connector.logout_count(), 0);
    }

    #[tokio::test]
    async fn inbound_messages_from_connected_session_reach_the_relay() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let connector = MockConnector::authenticating("62811");
        let relay = WebhookRelay::new(&jobcast_config::model::WebhookConfig {
            url: Some(server.uri()),
            token: None,
            timeout_secs: 2,
        })
        .unwrap();
        let manager = SessionManager::new(
            Arc::new(connector.clone()),
            CredentialStore::new(dir.path()),
            relay,
            DELAY,
        );

        manager.create_session("default").await.unwrap();
        assert!(wait_for_state(&manager, "default", SessionState::Connected).await);

        let inbound = |from_me: bool, id: &str| InboundMessage {
            message_id: id.to_string(),
            sender: "62822@s.whatsapp.net".to_string(),
            from_me,
            text: Some("halo".to_string()),
            timestamp: chrono::Utc::now(),
        };
        connector
            .emit("default", TransportEvent::Inbound(inbound(true, "echo")))
            .await;
        connector
            .emit("default", TransportEvent::Inbound(inbound(false, "real")))
            .await;

        for _ in 0..100 {
            if server.received_requests().await.map(|r| r.len()) == Some(1) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["messageId"], "real");

        // Sends go through the live client once connected.
        let client = manager.connected_client("default").await.unwrap();
        client
            .send("62822", OutboundPayload::Text { text: "hi".into() })
            .await
            .unwrap();
        assert_eq!(connector.sent_count().await, 1);
    }
}
