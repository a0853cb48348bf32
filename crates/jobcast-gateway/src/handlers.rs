// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use qrcode::QrCode;
use qrcode::render::svg;
use serde::{Deserialize, Serialize};
use tracing::info;

use jobcast_broadcast::{BROADCAST_QUEUE, templates};
use jobcast_core::JobcastError;
use jobcast_core::traits::{JobStore, TaskQueue};
use jobcast_core::types::{JobPosting, JobStatus, OutgoingMessage, QueueStats, SessionSnapshot};

use crate::error::{ApiError, ErrorResponse};
use crate::server::GatewayState;

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub sessions: usize,
}

/// Response body for GET /v1/sessions.
#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSnapshot>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Request body for POST /v1/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    /// Defaults to the configured default session.
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub message: OutgoingMessage,
}

/// Request body for POST /v1/messages/welcome.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub address: String,
    pub full_name: String,
    pub email: String,
    pub temporary_password: String,
}

/// Request body for POST /v1/messages/stage-update.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageUpdateRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub address: String,
    pub full_name: String,
    pub position: String,
    pub company: String,
    pub stage: String,
    pub application_ref: String,
}

/// Response body for the send endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message_id: String,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobEventKind {
    Created,
    Updated,
    Deleted,
}

/// Prior state of an updated job, as reported by the host platform.
#[derive(Debug, Deserialize)]
pub struct PreviousJob {
    pub status: JobStatus,
}

/// Request body for POST /v1/jobs/events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEventRequest {
    pub event: JobEventKind,
    #[serde(default)]
    pub job: Option<JobPosting>,
    /// Enough for `deleted` events.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub previous: Option<PreviousJob>,
}

#[derive(Debug, Serialize)]
pub struct JobEventResponse {
    pub scheduled: bool,
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(message))).into_response()
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        sessions: state.sessions.list_sessions().await.len(),
    })
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /v1/sessions
pub async fn list_sessions(State(state): State<GatewayState>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.sessions.list_sessions().await,
    })
}

/// POST /v1/sessions/{id}
pub async fn create_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.create_session(&id).await?))
}

/// GET /v1/sessions/{id}
pub async fn get_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state
        .sessions
        .get_session(&id)
        .await
        .map(Json)
        .ok_or_else(|| JobcastError::SessionNotFound(id).into())
}

/// DELETE /v1/sessions/{id}
pub async fn delete_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.sessions.delete_session(&id).await?;
    Ok(Json(DeleteResponse { deleted }))
}

/// POST /v1/sessions/{id}/restart
pub async fn restart_session(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    Ok(Json(state.sessions.restart_session(&id).await?))
}

/// GET /v1/sessions/{id}/qr
///
/// Renders the current pairing code as an SVG QR code.
pub async fn get_session_qr(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let snapshot = state
        .sessions
        .get_session(&id)
        .await
        .ok_or_else(|| JobcastError::SessionNotFound(id.clone()))?;
    let Some(code) = snapshot.pairing_code else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("session {id} has no pairing code"),
                state: Some(snapshot.state.to_string()),
            }),
        )
            .into_response());
    };

    let qr = QrCode::new(code.as_bytes())
        .map_err(|e| JobcastError::Internal(format!("failed to encode pairing code: {e}")))?;
    let image = qr
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build();
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], image).into_response())
}

async fn send(
    state: &GatewayState,
    session_id: Option<String>,
    message: &OutgoingMessage,
) -> Result<Json<SendResponse>, ApiError> {
    let session_id = session_id.unwrap_or_else(|| state.default_session_id.clone());
    let receipt = state.dispatcher.send_message(&session_id, message).await?;
    Ok(Json(SendResponse {
        success: true,
        message_id: receipt.message_id,
        recipient: receipt.recipient,
        timestamp: receipt.timestamp,
    }))
}

/// POST /v1/messages
pub async fn post_message(
    State(state): State<GatewayState>,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    send(&state, body.session_id, &body.message).await
}

/// POST /v1/messages/welcome
pub async fn post_welcome(
    State(state): State<GatewayState>,
    Json(body): Json<WelcomeRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let text = templates::welcome(&body.full_name, &body.email, &body.temporary_password);
    let message = OutgoingMessage::text(body.address, text).with_tag("template", "welcome");
    send(&state, body.session_id, &message).await
}

/// POST /v1/messages/stage-update
pub async fn post_stage_update(
    State(state): State<GatewayState>,
    Json(body): Json<StageUpdateRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let text = templates::stage_update(
        &body.full_name,
        &body.position,
        &body.company,
        &body.stage,
        &body.application_ref,
    );
    let message = OutgoingMessage::text(body.address, text)
        .with_tag("template", "stage_update")
        .with_tag("application_ref", body.application_ref.as_str());
    send(&state, body.session_id, &message).await
}

/// GET /v1/queue/stats
pub async fn get_queue_stats(
    State(state): State<GatewayState>,
) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(state.storage.stats(BROADCAST_QUEUE).await?))
}

/// POST /v1/jobs/events
///
/// Keeps the local job table in sync and lets the trigger decide whether a
/// broadcast run is scheduled.
pub async fn post_job_event(
    State(state): State<GatewayState>,
    Json(body): Json<JobEventRequest>,
) -> Result<Response, ApiError> {
    let scheduled = match body.event {
        JobEventKind::Created => {
            let Some(job) = body.job else {
                return Ok(bad_request("created event requires a job"));
            };
            state.storage.upsert_job(&job).await?;
            state.trigger.on_created(&job).await
        }
        JobEventKind::Updated => {
            let Some(job) = body.job else {
                return Ok(bad_request("updated event requires a job"));
            };
            let previous = match body.previous {
                Some(previous) => Some(previous.status),
                None => state.storage.get_job(&job.id).await?.map(|j| j.status),
            };
            state.storage.upsert_job(&job).await?;
            state.trigger.on_updated(previous, &job).await
        }
        JobEventKind::Deleted => {
            let Some(job_id) = body.job_id.or_else(|| body.job.map(|j| j.id)) else {
                return Ok(bad_request("deleted event requires a job or jobId"));
            };
            let removed = state.storage.delete_job(&job_id).await?;
            info!(job_id = %job_id, removed, "job removed from local table");
            state.trigger.on_deleted(&job_id);
            false
        }
    };
    Ok(Json(JobEventResponse { scheduled }).into_response())
}
