// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Paced bulk sends through one session.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use jobcast_config::model::DispatchConfig;
use jobcast_core::JobcastError;
use jobcast_core::types::{OutgoingMessage, SendResult};

use crate::address::normalize_address;
use crate::dispatcher::MessageDispatcher;

/// Sends many messages in input order with a fixed pause between sends.
#[derive(Clone)]
pub struct BulkSender {
    dispatcher: MessageDispatcher,
    delay: Duration,
}

impl BulkSender {
    pub fn new(dispatcher: MessageDispatcher, config: &DispatchConfig) -> Self {
        Self::with_delay(dispatcher, config.bulk_delay())
    }

    pub fn with_delay(dispatcher: MessageDispatcher, delay: Duration) -> Self {
        Self { dispatcher, delay }
    }

    /// Sends every message and returns one result per input, in input order.
    ///
    /// The session must be connected when the call starts; a disconnect
    /// mid-run shows up as failed results, not as an error. One failed item
    /// never stops the loop.
    pub async fn send_bulk(
        &self,
        session_id: &str,
        messages: &[OutgoingMessage],
    ) -> Result<Vec<SendResult>, JobcastError> {
        self.dispatcher.sessions().connected_client(session_id).await?;

        let mut results = Vec::with_capacity(messages.len());
        for (index, message) in messages.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            let result = match self.dispatcher.send_message(session_id, message).await {
                Ok(receipt) => SendResult {
                    success: true,
                    message_id: Some(receipt.message_id),
                    error: None,
                    recipient: receipt.recipient,
                    timestamp: receipt.timestamp,
                    original_index: index,
                },
                Err(e) => {
                    debug!(session_id, index, error = %e, "bulk item failed");
                    SendResult {
                        success: false,
                        message_id: None,
                        error: Some(e.to_string()),
                        recipient: normalize_address(
                            &message.address,
                            self.dispatcher.country_code(),
                        )
                        .unwrap_or_else(|_| message.address.clone()),
                        timestamp: Utc::now(),
                        original_index: index,
                    }
                }
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(
            session_id,
            total = results.len(),
            succeeded,
            failed = results.len() - succeeded,
            "bulk send finished"
        );
        Ok(results)
    }
}
