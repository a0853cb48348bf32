// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade so any recorder can collect these metrics.
//! Without an installed recorder every helper is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

fn outcome(ok: bool) -> &'static str {
    if ok { "success" } else { "failure" }
}

/// Register all Jobcast metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!("jobcast_messages_sent_total", "Outbound sends by kind and outcome");
    describe_counter!("jobcast_inbound_messages_total", "Inbound messages received");
    describe_counter!("jobcast_webhook_posts_total", "Webhook relay posts by outcome");
    describe_counter!("jobcast_broadcast_runs_total", "Completed broadcast runs");
    describe_counter!(
        "jobcast_broadcast_recipients_total",
        "Broadcast recipients by outcome"
    );
    describe_counter!("jobcast_queue_jobs_total", "Queue entries processed by outcome");
    describe_gauge!("jobcast_live_sessions", "Sessions in the live registry");
    describe_histogram!("jobcast_send_latency_seconds", "Transport send latency in seconds");
}

/// Record one outbound send attempt.
pub fn record_send(kind: &str, ok: bool) {
    metrics::counter!(
        "jobcast_messages_sent_total",
        "kind" => kind.to_string(),
        "outcome" => outcome(ok)
    )
    .increment(1);
}

/// Record transport send latency.
pub fn record_send_latency(seconds: f64) {
    metrics::histogram!("jobcast_send_latency_seconds").record(seconds);
}

/// Record an inbound message for a session.
pub fn record_inbound(session_id: &str) {
    metrics::counter!("jobcast_inbound_messages_total", "session" => session_id.to_string())
        .increment(1);
}

/// Record a webhook relay post.
pub fn record_webhook(ok: bool) {
    metrics::counter!("jobcast_webhook_posts_total", "outcome" => outcome(ok)).increment(1);
}

/// Record a completed broadcast run and its tallies.
pub fn record_broadcast_run(success: usize, failure: usize) {
    metrics::counter!("jobcast_broadcast_runs_total").increment(1);
    metrics::counter!("jobcast_broadcast_recipients_total", "outcome" => "success")
        .increment(success as u64);
    metrics::counter!("jobcast_broadcast_recipients_total", "outcome" => "failure")
        .increment(failure as u64);
}

/// Record a queue entry outcome: `completed`, `retrying` or `failed`.
pub fn record_queue_outcome(outcome: &'static str) {
    metrics::counter!("jobcast_queue_jobs_total", "outcome" => outcome).increment(1);
}

/// Set the number of sessions in the live registry.
pub fn set_live_sessions(count: usize) {
    metrics::gauge!("jobcast_live_sessions").set(count as f64);
}
