// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics for the Jobcast gateway.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. Library crates
//! call the recording helpers; the binary installs the recorder once and the
//! gateway renders it at `/metrics`.

pub mod recording;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use jobcast_core::JobcastError;

pub use recording::{
    record_broadcast_run, record_inbound, record_queue_outcome, record_send,
    record_send_latency, record_webhook, set_live_sessions,
};

/// Installed Prometheus recorder.
///
/// Only one recorder can be installed per process.
#[derive(Clone)]
pub struct PrometheusRecorder {
    handle: PrometheusHandle,
}

impl PrometheusRecorder {
    /// Installs the Prometheus recorder globally and registers metric
    /// descriptions. Fails if a recorder is already installed.
    pub fn install() -> Result<Self, JobcastError> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            JobcastError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;

        recording::register_metrics();

        tracing::info!("prometheus metrics recorder installed");

        Ok(Self { handle })
    }

    /// Wraps a handle from a recorder built elsewhere (tests).
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Render all collected metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
