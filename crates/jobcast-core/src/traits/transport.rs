// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter traits for the black-box chat protocol.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::JobcastError;
use crate::types::{Credentials, OutboundPayload, TransportEvent};

/// A live connection for one session.
///
/// Connection-state, pairing and inbound events arrive on the receiver
/// returned alongside the client by [`TransportConnector::connect`].
#[async_trait]
pub trait TransportClient: Send + Sync + 'static {
    /// Sends a payload to a normalized address. Returns the transport message id.
    async fn send(&self, address: &str, payload: OutboundPayload) -> Result<String, JobcastError>;

    /// Deliberately logs the account out. The connection emits
    /// `Closed { logged_out: true }` afterwards.
    async fn logout(&self) -> Result<(), JobcastError>;

    /// Closes the connection without logging out.
    async fn close(&self);
}

/// A freshly opened connection: the client handle and its event stream.
pub struct TransportConnection {
    pub client: Arc<dyn TransportClient>,
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens transport connections.
#[async_trait]
pub trait TransportConnector: Send + Sync + 'static {
    /// Opens a connection for `session_id`, resuming from `credentials` when
    /// present. Without credentials the transport starts a pairing flow.
    async fn connect(
        &self,
        session_id: &str,
        credentials: Option<Credentials>,
    ) -> Result<TransportConnection, JobcastError>;
}
