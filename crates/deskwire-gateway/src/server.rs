// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use deskwire_core::DeskwireError;
use deskwire_ingest::Pipeline;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;
use crate::hub::FanoutHub;
use crate::ws;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The ingest pipeline; every /v1 route delegates to it.
    pub pipeline: Arc<Pipeline>,
    /// Fan-out hub feeding the WebSocket route.
    pub hub: Arc<FanoutHub>,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Optional Prometheus metrics render function for /metrics.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Process start time for uptime reporting.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors `GatewayConfig` from
/// `deskwire-config` to avoid a dependency on the config crate).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Start the gateway HTTP/WebSocket server, running until `shutdown` fires.
///
/// Routes:
/// - GET /health, GET /metrics (unauthenticated)
/// - POST /v1/connections/{id}/start|stop|sync (bearer auth)
/// - POST /v1/tickets, /v1/tickets/{id}/messages, /v1/tickets/{id}/read (bearer auth)
/// - GET /ws (auth via query parameter during handshake, not middleware)
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), DeskwireError> {
    let auth_state = state.auth.clone();

    // Unauthenticated public routes (health + metrics for systemd and Prometheus).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/metrics", get(handlers::get_metrics))
        .with_state(state.clone());

    // Routes requiring authentication.
    let api_routes = Router::new()
        .route("/v1/connections/{id}/start", post(handlers::post_start))
        .route("/v1/connections/{id}/stop", post(handlers::post_stop))
        .route("/v1/connections/{id}/sync", post(handlers::post_sync))
        .route("/v1/tickets", post(handlers::post_open_ticket))
        .route("/v1/tickets/{id}/messages", post(handlers::post_send_message))
        .route("/v1/tickets/{id}/read", post(handlers::post_mark_read))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state.clone());

    // WebSocket route (auth happens during handshake, not via middleware).
    let ws_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(ws_routes)
        .layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| DeskwireError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| DeskwireError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}
