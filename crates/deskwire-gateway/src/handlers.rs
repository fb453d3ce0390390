// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Every /v1 route is a thin wrapper over a pipeline operation; request and
//! response bodies use the same camelCase dialect as the wire envelopes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use deskwire_ingest::StartOptions;
use deskwire_storage::models::{Contact, Message, Ticket};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Request body for POST /v1/connections/{id}/start.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub tenant_id: i64,
    #[serde(default)]
    pub use_pairing_code: bool,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sync_full_history: bool,
    #[serde(default)]
    pub force: bool,
}

/// Request body for routes that only need tenant scoping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantScoped {
    pub tenant_id: i64,
}

/// Request body for POST /v1/tickets.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTicketRequest {
    pub tenant_id: i64,
    pub connection_id: i64,
    pub identifier: String,
}

/// Request body for POST /v1/tickets/{id}/messages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub tenant_id: i64,
    pub body: String,
    #[serde(default)]
    pub quoted_msg_id: Option<String>,
}

/// Response body for POST /v1/tickets.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTicketResponse {
    pub ticket: Ticket,
    pub contact: Contact,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// GET /health (unauthenticated, for process supervision).
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /metrics (unauthenticated, Prometheus text format).
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// POST /v1/connections/{id}/start
///
/// 202 when the start command was accepted, 409 when a start for this
/// connection is already in flight.
pub async fn post_start(
    State(state): State<GatewayState>,
    Path(connection_id): Path<i64>,
    Json(body): Json<StartRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .pipeline
        .start_session(
            body.tenant_id,
            connection_id,
            StartOptions {
                use_pairing_code: body.use_pairing_code,
                phone: body.phone,
                sync_full_history: body.sync_full_history,
                force: body.force,
            },
        )
        .await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /v1/connections/{id}/stop
pub async fn post_stop(
    State(state): State<GatewayState>,
    Path(connection_id): Path<i64>,
    Json(body): Json<TenantScoped>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.stop_session(body.tenant_id, connection_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /v1/connections/{id}/sync
pub async fn post_sync(
    State(state): State<GatewayState>,
    Path(connection_id): Path<i64>,
    Json(body): Json<TenantScoped>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.sync_connection(body.tenant_id, connection_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /v1/tickets
///
/// Opens (or returns) a conversation to an identifier. Waits on the
/// enrichment barrier, so the response carries a presentable contact.
pub async fn post_open_ticket(
    State(state): State<GatewayState>,
    Json(body): Json<OpenTicketRequest>,
) -> Result<(StatusCode, Json<OpenTicketResponse>), ApiError> {
    let (ticket, contact) = state
        .pipeline
        .open_ticket(body.tenant_id, body.connection_id, &body.identifier)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OpenTicketResponse { ticket, contact }),
    ))
}

/// POST /v1/tickets/{id}/messages
///
/// Returns the placeholder row; the confirming event later swaps it for the
/// engine-assigned id.
pub async fn post_send_message(
    State(state): State<GatewayState>,
    Path(ticket_id): Path<i64>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let placeholder = state
        .pipeline
        .send_text(body.tenant_id, ticket_id, &body.body, body.quoted_msg_id)
        .await?;
    Ok((StatusCode::CREATED, Json(placeholder)))
}

/// POST /v1/tickets/{id}/read
pub async fn post_mark_read(
    State(state): State<GatewayState>,
    Path(ticket_id): Path<i64>,
    Json(body): Json<TenantScoped>,
) -> Result<StatusCode, ApiError> {
    state.pipeline.mark_ticket_read(body.tenant_id, ticket_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_defaults_optional_knobs() {
        let body: StartRequest = serde_json::from_str(r#"{"tenantId": 1}"#).unwrap();
        assert_eq!(body.tenant_id, 1);
        assert!(!body.use_pairing_code);
        assert!(body.phone.is_none());
        assert!(!body.force);
    }

    #[test]
    fn send_message_request_accepts_quote() {
        let body: SendMessageRequest = serde_json::from_str(
            r#"{"tenantId": 1, "body": "hi", "quotedMsgId": "wa-9"}"#,
        )
        .unwrap();
        assert_eq!(body.quoted_msg_id.as_deref(), Some("wa-9"));
    }

    #[test]
    fn open_ticket_request_is_camel_case() {
        let body: OpenTicketRequest = serde_json::from_str(
            r#"{"tenantId": 1, "connectionId": 3, "identifier": "5511999@c.us"}"#,
        )
        .unwrap();
        assert_eq!(body.connection_id, 3);
    }
}
