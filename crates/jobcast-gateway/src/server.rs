// SPDX-FileCopyrightText: 2026 Jobcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self as axum_middleware, Next},
    response::Response,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use jobcast_broadcast::EventTrigger;
use jobcast_core::JobcastError;
use jobcast_dispatch::MessageDispatcher;
use jobcast_session::SessionManager;
use jobcast_storage::SqliteStorage;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Prometheus render function; `/metrics` answers 404 without it.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub sessions: SessionManager,
    pub dispatcher: MessageDispatcher,
    /// Job postings and the broadcast queue.
    pub storage: SqliteStorage,
    pub trigger: Arc<EventTrigger>,
    /// Session used when a send request names none.
    pub default_session_id: String,
    pub auth: AuthConfig,
    pub health: HealthState,
}

/// Address the gateway binds to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the full route table.
///
/// - GET /health, GET /metrics (public)
/// - /v1/sessions, /v1/messages, /v1/queue/stats, /v1/jobs/events (bearer auth)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/sessions", get(handlers::list_sessions))
        .route(
            "/v1/sessions/{id}",
            get(handlers::get_session)
                .post(handlers::create_session)
                .delete(handlers::delete_session),
        )
        .route("/v1/sessions/{id}/restart", post(handlers::restart_session))
        .route("/v1/sessions/{id}/qr", get(handlers::get_session_qr))
        .route("/v1/messages", post(handlers::post_message))
        .route("/v1/messages/welcome", post(handlers::post_welcome))
        .route("/v1/messages/stage-update", post(handlers::post_stage_update))
        .route("/v1/queue/stats", get(handlers::get_queue_stats))
        .route("/v1/jobs/events", post(handlers::post_job_event))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(axum_middleware::from_fn(request_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags each request with an id (the caller's `x-request-id` or a fresh
/// UUID), runs it inside a span carrying that id and echoes it back.
async fn request_id(request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", request_id = %id);
    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Binds to `host:port` and serves until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), JobcastError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| JobcastError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| JobcastError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("Gateway server stopped");
    Ok(())
}
