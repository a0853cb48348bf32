// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Schedules broadcast runs from job posting lifecycle events.
//!
//! Scheduling failures are logged and never surface to the caller, so a
//! broken queue cannot fail the write that produced the event.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use jobcast_config::model::BroadcastConfig;
use jobcast_core::traits::TaskQueue;
use jobcast_core::types::{JobPosting, JobStatus};

/// Queue holding pending broadcast runs.
pub const BROADCAST_QUEUE: &str = "broadcast";

/// Queue payload of one broadcast run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastTask {
    pub job_id: String,
}

pub struct EventTrigger {
    queue: Arc<dyn TaskQueue>,
    enabled: bool,
    delay: Duration,
    max_attempts: u32,
}

impl EventTrigger {
    pub fn new(queue: Arc<dyn TaskQueue>, config: &BroadcastConfig) -> Self {
        Self {
            queue,
            enabled: config.enabled,
            delay: config.trigger_delay(),
            max_attempts: config.max_attempts,
        }
    }

    /// A new posting. Schedules a run if it is already published with
    /// broadcasting on. Returns whether a run was scheduled.
    pub async fn on_created(&self, job: &JobPosting) -> bool {
        if !job.is_broadcastable() {
            debug!(job_id = %job.id, status = %job.status, "created job not broadcastable");
            return false;
        }
        self.schedule(&job.id).await
    }

    /// An updated posting. Schedules a run only on the transition into
    /// published.
    pub async fn on_updated(&self, previous: Option<JobStatus>, job: &JobPosting) -> bool {
        let became_published =
            previous != Some(JobStatus::Published) && job.status == JobStatus::Published;
        if !became_published || !job.broadcast_enabled {
            debug!(job_id = %job.id, ?previous, status = %job.status, "update does not trigger broadcast");
            return false;
        }
        self.schedule(&job.id).await
    }

    pub fn on_deleted(&self, job_id: &str) {
        info!(job_id, "job deleted");
    }

    async fn schedule(&self, job_id: &str) -> bool {
        if !self.enabled {
            info!(job_id, "broadcasting disabled, run not scheduled");
            return false;
        }

        let task = BroadcastTask {
            job_id: job_id.to_string(),
        };
        let payload = match serde_json::to_string(&task) {
            Ok(payload) => payload,
            Err(e) => {
                error!(job_id, error = %e, "failed to encode broadcast task");
                return false;
            }
        };

        match self
            .queue
            .enqueue(BROADCAST_QUEUE, &payload, self.delay, self.max_attempts)
            .await
        {
            Ok(id) => {
                info!(job_id, queue_id = id, delay_secs = self.delay.as_secs(), "broadcast scheduled");
                true
            }
            Err(e) => {
                error!(job_id, error = %e, "failed to schedule broadcast");
                false
            }
        }
    }
}
