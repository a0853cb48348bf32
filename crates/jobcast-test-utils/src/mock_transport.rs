// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic session and dispatch tests.
//!
//! `MockConnector` implements `TransportConnector`. Every `connect()` opens a
//! fresh `MockTransport` whose event channel the test can drive through
//! [`MockConnector::emit`]. Outbound sends from all connections are captured
//! in one list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use jobcast_core::JobcastError;
use jobcast_core::traits::{TransportClient, TransportConnection, TransportConnector};
use jobcast_core::types::{Credentials, OutboundPayload, TransportEvent};

/// A send captured by the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub session_id: String,
    pub address: String,
    pub payload: OutboundPayload,
}

#[derive(Default)]
struct MockState {
    connects: AtomicUsize,
    connect_failures: AtomicUsize,
    logouts: AtomicUsize,
    closes: AtomicUsize,
    on_connect: Mutex<Vec<TransportEvent>>,
    senders: Mutex<HashMap<String, mpsc::Sender<TransportEvent>>>,
    credentials_seen: Mutex<Vec<(String, Option<Credentials>)>>,
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    send_delay: Mutex<Option<Duration>>,
    connect_delays: Mutex<HashMap<String, Duration>>,
}

/// A scriptable transport connector.
///
/// Cheap to clone; clones share state so a test can keep one handle while
/// the session manager owns another.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    /// A connector whose connections stay in the initial state until the
    /// test emits events.
    pub fn new() -> Self {
        Self::default()
    }

    /// A connector whose connections authenticate immediately as `identity`.
    pub fn authenticating(identity: &str) -> Self {
        let state = MockState {
            on_connect: Mutex::new(vec![TransportEvent::Authenticated {
                identity: identity.to_string(),
            }]),
            ..MockState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Events pushed onto every new connection's channel right after connect.
    pub async fn set_connect_events(&self, events: Vec<TransportEvent>) {
        *self.state.on_connect.lock().await = events;
    }

    /// Pushes an event onto the latest connection of `session_id`.
    /// Returns false if there is no open channel for the session.
    pub async fn emit(&self, session_id: &str, event: TransportEvent) -> bool {
        let sender = self.state.senders.lock().await.get(session_id).cloned();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Makes the next `n` connect attempts fail with a transport error.
    pub fn fail_next_connects(&self, n: usize) {
        self.state.connect_failures.store(n, Ordering::SeqCst);
    }

    /// Makes every send to `address` fail.
    pub async fn fail_sends_to(&self, address: &str) {
        self.state.failing.lock().await.insert(address.to_string());
    }

    /// Delays every send by `delay`.
    pub async fn set_send_delay(&self, delay: Duration) {
        *self.state.send_delay.lock().await = Some(delay);
    }

    /// Delays every connect for `session_id` by `delay`. The attempt is
    /// counted before the delay starts.
    pub async fn set_connect_delay(&self, session_id: &str, delay: Duration) {
        self.state
            .connect_delays
            .lock()
            .await
            .insert(session_id.to_string(), delay);
    }

    /// Number of successful and failed connect attempts.
    pub fn connect_count(&self) -> usize {
        self.state.connects.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// The credentials passed to each connect call, in order.
    pub async fn credentials_seen(&self) -> Vec<(String, Option<Credentials>)> {
        self.state.credentials_seen.lock().await.clone()
    }

    /// All sends captured so far, in order.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.state.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.state.sent.lock().await.len()
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn connect(
        &self,
        session_id: &str,
        credentials: Option<Credentials>,
    ) -> Result<TransportConnection, JobcastError> {
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        self.state
            .credentials_seen
            .lock()
            .await
            .push((session_id.to_string(), credentials));

        let delay = self.state.connect_delays.lock().await.get(session_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let remaining = self.state.connect_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.state
                .connect_failures
                .store(remaining - 1, Ordering::SeqCst);
            return Err(JobcastError::transport("mock connect refused"));
        }

        let (tx, rx) = mpsc::channel(64);
        for event in self.state.on_connect.lock().await.iter().cloned() {
            // Fresh channel with capacity 64; a full buffer means a broken test.
            let _ = tx.try_send(event);
        }
        self.state
            .senders
            .lock()
            .await
            .insert(session_id.to_string(), tx.clone());

        let client = MockTransport {
            session_id: session_id.to_string(),
            events: tx,
            state: self.state.clone(),
        };
        Ok(TransportConnection {
            client: Arc::new(client),
            events: rx,
        })
    }
}

struct MockTransport {
    session_id: String,
    events: mpsc::Sender<TransportEvent>,
    state: Arc<MockState>,
}

#[async_trait]
impl TransportClient for MockTransport {
    async fn send(&self, address: &str, payload: OutboundPayload) -> Result<String, JobcastError> {
        let delay = *self.state.send_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.state.failing.lock().await.contains(address) {
            return Err(JobcastError::transport(format!("mock send to {address} rejected")));
        }
        self.state.sent.lock().await.push(SentMessage {
            session_id: self.session_id.clone(),
            address: address.to_string(),
            payload,
        });
        Ok(format!("mock-msg-{}", uuid::Uuid::new_v4()))
    }

    async fn logout(&self) -> Result<(), JobcastError> {
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
        let _ = self
            .events
            .send(TransportEvent::Closed {
                logged_out: true,
                reason: "logged out".to_string(),
            })
            .await;
        Ok(())
    }

    async fn close(&self) {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
    }
}
