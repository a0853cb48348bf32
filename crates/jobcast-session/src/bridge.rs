// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket bridge to the chat-protocol sidecar.
//!
//! The sidecar owns the wire protocol. Each session opens one socket at
//! `{transport_url}/{session_id}` and exchanges JSON frames: the gateway
//! sends `hello`, `send` and `logout` ops; the sidecar answers with
//! lifecycle events and `send_result` frames correlated by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use jobcast_core::JobcastError;
use jobcast_core::traits::{TransportClient, TransportConnection, TransportConnector};
use jobcast_core::types::{Credentials, InboundMessage, OutboundPayload, TransportEvent};

/// Frames sent to the sidecar.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ClientFrame {
    Hello { credentials: Option<String> },
    Send {
        id: u64,
        to: String,
        payload: OutboundPayload,
    },
    Logout,
}

/// Frames received from the sidecar.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ServerFrame {
    PairingCode { code: String },
    Authenticated { identity: String },
    Credentials { data: String },
    Message(InboundMessage),
    Receipt {
        message_id: String,
        recipient: String,
        status: String,
    },
    Closed {
        #[serde(default)]
        logged_out: bool,
        #[serde(default)]
        reason: String,
    },
    SendResult {
        id: u64,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

type PendingTx = oneshot::Sender<Result<String, String>>;

enum BridgeCommand {
    Send {
        to: String,
        payload: OutboundPayload,
        reply: PendingTx,
    },
    Logout,
    Close,
}

/// Opens sidecar sockets for sessions.
#[derive(Debug, Clone)]
pub struct BridgeConnector {
    base_url: String,
    /// Bound on the WebSocket handshake plus the `hello` frame.
    connect_timeout: Duration,
}

impl BridgeConnector {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout,
        }
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/{session_id}", self.base_url)
    }
}

#[async_trait]
impl TransportConnector for BridgeConnector {
    async fn connect(
        &self,
        session_id: &str,
        credentials: Option<Credentials>,
    ) -> Result<TransportConnection, JobcastError> {
        let url = self.session_url(session_id);
        let ws = tokio::time::timeout(self.connect_timeout, open_socket(&url, credentials))
            .await
            .map_err(|_| JobcastError::Timeout {
                duration: self.connect_timeout,
            })??;

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (event_tx, event_rx) = mpsc::channel(64);
        tokio::spawn(bridge_loop(session_id.to_string(), ws, cmd_rx, event_tx));

        debug!(session_id, %url, "bridge connected");
        Ok(TransportConnection {
            client: Arc::new(BridgeClient { cmd_tx }),
            events: event_rx,
        })
    }
}

/// Completes the handshake and sends `hello`.
async fn open_socket(url: &str, credentials: Option<Credentials>) -> Result<WsStream, JobcastError> {
    let (mut ws, _) = connect_async(url).await.map_err(|e| JobcastError::Transport {
        message: format!("failed to connect to {url}"),
        source: Some(Box::new(e)),
    })?;

    let hello = ClientFrame::Hello {
        credentials: credentials.map(|c| BASE64.encode(c.0)),
    };
    let hello = serde_json::to_string(&hello)
        .map_err(|e| JobcastError::Internal(format!("failed to encode hello: {e}")))?;
    ws.send(Message::Text(hello.into()))
        .await
        .map_err(|e| JobcastError::Transport {
            message: "failed to send hello".to_string(),
            source: Some(Box::new(e)),
        })?;
    Ok(ws)
}

struct BridgeClient {
    cmd_tx: mpsc::Sender<BridgeCommand>,
}

fn closed_err() -> JobcastError {
    JobcastError::transport("bridge connection closed")
}

#[async_trait]
impl TransportClient for BridgeClient {
    async fn send(&self, address: &str, payload: OutboundPayload) -> Result<String, JobcastError> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(BridgeCommand::Send {
                to: address.to_string(),
                payload,
                reply,
            })
            .await
            .map_err(|_| closed_err())?;
        rx.await
            .map_err(|_| closed_err())?
            .map_err(JobcastError::transport)
    }

    async fn logout(&self) -> Result<(), JobcastError> {
        self.cmd_tx
            .send(BridgeCommand::Logout)
            .await
            .map_err(|_| closed_err())
    }

    async fn close(&self) {
        let _ = self.cmd_tx.send(BridgeCommand::Close).await;
    }
}

fn to_event(frame: ServerFrame) -> Option<TransportEvent> {
    Some(match frame {
        ServerFrame::PairingCode { code } => TransportEvent::PairingCode(code),
        ServerFrame::Authenticated { identity } => TransportEvent::Authenticated { identity },
        ServerFrame::Credentials { data } => match BASE64.decode(data) {
            Ok(bytes) => TransportEvent::CredentialsUpdated(Credentials(bytes)),
            Err(e) => {
                warn!(error = %e, "sidecar sent undecodable credentials");
                return None;
            }
        },
        ServerFrame::Message(msg) => TransportEvent::Inbound(msg),
        ServerFrame::Receipt {
            message_id,
            recipient,
            status,
        } => TransportEvent::Receipt {
            message_id,
            recipient,
            status,
        },
        ServerFrame::Closed { logged_out, reason } => TransportEvent::Closed { logged_out, reason },
        ServerFrame::SendResult { .. } => return None,
    })
}

async fn bridge_loop(
    session_id: String,
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<BridgeCommand>,
    event_tx: mpsc::Sender<TransportEvent>,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<u64, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    let close_reason = loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let frame = match cmd {
                    Some(BridgeCommand::Send { to, payload, reply }) => {
                        let id = next_id;
                        next_id += 1;
                        pending.insert(id, reply);
                        ClientFrame::Send { id, to, payload }
                    }
                    Some(BridgeCommand::Logout) => ClientFrame::Logout,
                    Some(BridgeCommand::Close) | None => {
                        let _ = ws_tx.close().await;
                        debug!(%session_id, "bridge closed locally");
                        return;
                    }
                };
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(%session_id, error = %e, "failed to encode bridge frame");
                        continue;
                    }
                };
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    break format!("write failed: {e}");
                }
            }
            msg = ws_rx.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break "socket closed".to_string(),
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => break format!("read failed: {e}"),
                };
                let frame: ServerFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(%session_id, error = %e, "ignoring malformed bridge frame");
                        continue;
                    }
                };
                if let ServerFrame::SendResult { id, message_id, error } = &frame {
                    if let Some(reply) = pending.remove(id) {
                        let result = match (message_id, error) {
                            (_, Some(error)) => Err(error.clone()),
                            (Some(message_id), None) => Ok(message_id.clone()),
                            (None, None) => Err("send result without message id".to_string()),
                        };
                        let _ = reply.send(result);
                    }
                    continue;
                }
                let closed = matches!(frame, ServerFrame::Closed { .. });
                if let Some(event) = to_event(frame)
                    && event_tx.send(event).await.is_err()
                {
                    return;
                }
                if closed {
                    return;
                }
            }
        }
    };

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(close_reason.clone()));
    }
    let _ = event_tx
        .send(TransportEvent::Closed {
            logged_out: false,
            reason: close_reason,
        })
        .await;
}
