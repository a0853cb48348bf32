// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwards inbound messages to the host platform's webhook.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use jobcast_config::model::WebhookConfig;
use jobcast_core::JobcastError;
use jobcast_core::types::InboundMessage;

/// Body POSTed to the webhook for each inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    pub session_id: String,
    pub phone_number: String,
    pub message: String,
    pub message_id: String,
    pub timestamp: DateTime<Utc>,
}

impl InboundEnvelope {
    /// Builds the envelope, or `None` for messages without text.
    pub fn from_message(session_id: &str, msg: &InboundMessage) -> Option<Self> {
        let text = msg.text.as_deref().filter(|t| !t.trim().is_empty())?;
        Some(Self {
            session_id: session_id.to_string(),
            phone_number: sender_address(&msg.sender).to_string(),
            message: text.to_string(),
            message_id: msg.message_id.clone(),
            timestamp: msg.timestamp,
        })
    }
}

/// Strips the transport's domain and device suffixes (`62811:3@host` -> `62811`).
fn sender_address(sender: &str) -> &str {
    let user = sender.split('@').next().unwrap_or(sender);
    user.split(':').next().unwrap_or(user)
}

/// HTTP relay for inbound messages. Disabled when no URL is configured.
#[derive(Clone)]
pub struct WebhookRelay {
    client: reqwest::Client,
    url: Option<String>,
    token: Option<String>,
}

impl std::fmt::Debug for WebhookRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookRelay")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl WebhookRelay {
    pub fn new(config: &WebhookConfig) -> Result<Self, JobcastError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| JobcastError::Internal(format!("failed to build webhook client: {e}")))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
            token: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }

    /// Posts the message to the webhook. Failures are logged and swallowed;
    /// returns whether the webhook accepted it.
    pub async fn relay(&self, session_id: &str, msg: &InboundMessage) -> bool {
        let Some(url) = self.url.as_deref() else {
            debug!(session_id, message_id = %msg.message_id, "webhook disabled, inbound message not relayed");
            return false;
        };
        let Some(envelope) = InboundEnvelope::from_message(session_id, msg) else {
            debug!(session_id, message_id = %msg.message_id, "inbound message without text skipped");
            return false;
        };

        let mut request = self.client.post(url).json(&envelope);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let delivered = match request.send().await {
            Ok(resp) if resp.status().is_success() => {
                debug!(session_id, message_id = %envelope.message_id, "inbound message relayed");
                true
            }
            Ok(resp) => {
                warn!(session_id, status = %resp.status(), "webhook rejected inbound message");
                false
            }
            Err(e) => {
                warn!(session_id, error = %e, "webhook relay failed");
                false
            }
        };
        jobcast_prometheus::record_webhook(delivered);
        delivered
    }
}
