// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session control and status bookkeeping.
//!
//! `session.start` is guarded by a short-TTL lock in the coordination
//! store: acquisition failure surfaces as [`DeskwireError::SessionBusy`]
//! and is never retried here. A successful publish leaves the lock to
//! expire on its own, debouncing rapid re-clicks; a failed publish
//! releases it immediately so the user can try again.

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::{
    Command, ContactSync, HistorySync, PairingCodeEvent, QrcodeEvent, StartSession, StatusEvent,
    StopSession,
};
use deskwire_core::types::{SessionSnapshot, SessionStatus};
use deskwire_coord::keys;
use deskwire_storage::models::Connection;
use deskwire_storage::queries::connections;

use crate::pipeline::Pipeline;

/// Caller-supplied knobs for a session start.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub use_pairing_code: bool,
    pub phone: Option<String>,
    pub sync_full_history: bool,
    pub force: bool,
}

impl Pipeline {
    async fn connection_for(
        &self,
        tenant_id: i64,
        connection_id: i64,
    ) -> Result<Connection, DeskwireError> {
        let connection = connections::get_connection(&self.db, connection_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "connection",
                id: connection_id.to_string(),
            })?;
        if connection.tenant_id != tenant_id {
            return Err(DeskwireError::NotFound {
                entity: "connection",
                id: connection_id.to_string(),
            });
        }
        Ok(connection)
    }

    /// Publish `session.start` for a connection, at most one in flight.
    pub async fn start_session(
        &self,
        tenant_id: i64,
        connection_id: i64,
        options: StartOptions,
    ) -> Result<(), DeskwireError> {
        let connection = self.connection_for(tenant_id, connection_id).await?;

        let lock_key = keys::start_lock(connection_id);
        if !self
            .coordinator
            .acquire(&lock_key, self.settings.start_lock_ttl)
            .await?
        {
            info!(connection_id, "session start already in progress");
            return Err(DeskwireError::SessionBusy { connection_id });
        }

        let command = Command::SessionStart(StartSession {
            session_id: connection_id,
            use_pairing_code: options.use_pairing_code,
            phone: options.phone,
            sync_full_history: options.sync_full_history,
            force: options.force,
        });
        let envelope = command.to_envelope(tenant_id)?;
        if let Err(e) = self
            .publisher
            .publish(envelope, connection_id, &connection.engine)
            .await
        {
            // Publish failed; give the lock back so a retry is possible.
            if let Err(release_err) = self.coordinator.release(&lock_key).await {
                warn!(connection_id, error = %release_err, "start lock release failed");
            }
            return Err(e);
        }

        connections::update_status(&self.db, connection_id, SessionStatus::Opening).await?;
        self.emit_session(
            tenant_id,
            serde_json::json!({ "connectionId": connection_id, "status": SessionStatus::Opening }),
        )
        .await;
        Ok(())
    }

    /// Publish `session.stop`. Not guarded; stopping twice is harmless.
    pub async fn stop_session(
        &self,
        tenant_id: i64,
        connection_id: i64,
    ) -> Result<(), DeskwireError> {
        let connection = self.connection_for(tenant_id, connection_id).await?;
        let command = Command::SessionStop(StopSession {
            session_id: connection_id,
        });
        self.publisher
            .publish(command.to_envelope(tenant_id)?, connection_id, &connection.engine)
            .await
    }

    /// Ask the engine for a full roster and history sync.
    pub async fn sync_connection(
        &self,
        tenant_id: i64,
        connection_id: i64,
    ) -> Result<(), DeskwireError> {
        let connection = self.connection_for(tenant_id, connection_id).await?;
        let contact_sync = Command::ContactSync(ContactSync {
            session_id: connection_id,
            identifier: None,
        });
        self.publisher
            .publish(
                contact_sync.to_envelope(tenant_id)?,
                connection_id,
                &connection.engine,
            )
            .await?;
        let history_sync = Command::HistorySync(HistorySync {
            session_id: connection_id,
            days: None,
        });
        self.publisher
            .publish(
                history_sync.to_envelope(tenant_id)?,
                connection_id,
                &connection.engine,
            )
            .await
    }

    /// Handle `session.status`: the connections table is authoritative,
    /// the coordination-store cache is written best effort alongside.
    pub async fn handle_status(
        &self,
        tenant_id: i64,
        event: StatusEvent,
    ) -> Result<(), DeskwireError> {
        connections::update_status(&self.db, event.session_id, event.status).await?;

        let snapshot = SessionSnapshot {
            status: event.status,
            detail: event.detail.clone(),
            updated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        if let Err(e) = self.coordinator.put_status(event.session_id, &snapshot).await {
            warn!(connection_id = event.session_id, error = %e, "status cache write failed");
        }

        info!(connection_id = event.session_id, status = %event.status, "session status");
        self.emit_session(
            tenant_id,
            serde_json::json!({
                "connectionId": event.session_id,
                "status": event.status,
                "detail": event.detail,
            }),
        )
        .await;
        Ok(())
    }

    /// Handle `session.qrcode`: persist the code for the UI to render.
    pub async fn handle_qrcode(
        &self,
        tenant_id: i64,
        event: QrcodeEvent,
    ) -> Result<(), DeskwireError> {
        connections::set_qrcode(&self.db, event.session_id, &event.qrcode).await?;
        connections::update_status(&self.db, event.session_id, SessionStatus::Qrcode).await?;
        self.emit_session(
            tenant_id,
            serde_json::json!({
                "connectionId": event.session_id,
                "status": SessionStatus::Qrcode,
                "qrcode": event.qrcode,
            }),
        )
        .await;
        Ok(())
    }

    /// Handle `session.pairingcode`.
    pub async fn handle_pairing_code(
        &self,
        tenant_id: i64,
        event: PairingCodeEvent,
    ) -> Result<(), DeskwireError> {
        connections::set_pairing_code(&self.db, event.session_id, &event.code).await?;
        connections::update_status(&self.db, event.session_id, SessionStatus::Pairing).await?;
        self.emit_session(
            tenant_id,
            serde_json::json!({
                "connectionId": event.session_id,
                "status": SessionStatus::Pairing,
                "pairingCode": event.code,
            }),
        )
        .await;
        Ok(())
    }
}
