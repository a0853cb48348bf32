// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single message delivery.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, warn};

use jobcast_config::model::DispatchConfig;
use jobcast_core::JobcastError;
use jobcast_core::types::{MessageKind, OutboundPayload, OutgoingMessage, SendReceipt};
use jobcast_session::SessionManager;

use crate::address::normalize_address;

/// Sends one message through a connected session.
///
/// Never queues and never retries: a session that is not connected fails
/// with `SessionNotReady` before any transport call.
#[derive(Clone)]
pub struct MessageDispatcher {
    sessions: SessionManager,
    country_code: String,
    send_timeout: Duration,
}

impl MessageDispatcher {
    pub fn new(sessions: SessionManager, config: &DispatchConfig) -> Self {
        Self {
            sessions,
            country_code: config.country_code.clone(),
            send_timeout: config.send_timeout(),
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub async fn send_message(
        &self,
        session_id: &str,
        message: &OutgoingMessage,
    ) -> Result<SendReceipt, JobcastError> {
        let client = self.sessions.connected_client(session_id).await?;
        let recipient = normalize_address(&message.address, &self.country_code)?;
        let payload = build_payload(message)?;

        let started = Instant::now();
        let result = tokio::time::timeout(self.send_timeout, client.send(&recipient, payload)).await;
        jobcast_prometheus::record_send_latency(started.elapsed().as_secs_f64());

        let kind = message.kind.to_string();
        match result {
            Ok(Ok(message_id)) => {
                jobcast_prometheus::record_send(&kind, true);
                debug!(session_id, %recipient, %message_id, %kind, "message sent");
                Ok(SendReceipt {
                    message_id,
                    recipient,
                    timestamp: Utc::now(),
                })
            }
            Ok(Err(e)) => {
                jobcast_prometheus::record_send(&kind, false);
                warn!(session_id, %recipient, error = %e, "send failed");
                Err(e)
            }
            Err(_) => {
                jobcast_prometheus::record_send(&kind, false);
                warn!(session_id, %recipient, timeout = ?self.send_timeout, "send timed out");
                Err(JobcastError::Timeout {
                    duration: self.send_timeout,
                })
            }
        }
    }
}

/// Builds the transport payload for a message's kind.
pub fn build_payload(message: &OutgoingMessage) -> Result<OutboundPayload, JobcastError> {
    let caption = Some(message.body.clone()).filter(|b| !b.trim().is_empty());

    let media = match message.kind {
        MessageKind::Text => {
            return Ok(OutboundPayload::Text {
                text: message.body.clone(),
            });
        }
        MessageKind::Image | MessageKind::Document => message
            .media
            .clone()
            .filter(|m| m.url.is_some() || m.data.is_some())
            .ok_or_else(|| {
                JobcastError::InvalidMessage(format!("{} message requires media", message.kind))
            })?,
    };

    Ok(match message.kind {
        MessageKind::Image => OutboundPayload::Image { media, caption },
        _ => OutboundPayload::Document {
            file_name: media
                .file_name
                .clone()
                .unwrap_or_else(|| "document".to_string()),
            media,
            caption,
        },
    })
}
