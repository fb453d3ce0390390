// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fan-out helpers shared by the handler modules.
//!
//! Every mutation is announced to the tenant notification room; ticket and
//! message events additionally target the ticket's own room and the room
//! for its current status column.

use serde_json::Value;
use tracing::warn;

use deskwire_core::rooms::{RoomEvent, fanout, notification_room, status_room, ticket_room};
use deskwire_core::types::EntityAction;
use deskwire_storage::models::{Contact, Ticket};

use crate::pipeline::Pipeline;

fn to_payload<T: serde::Serialize>(entity: &T) -> Option<Value> {
    match serde_json::to_value(entity) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "fan-out payload encode failed");
            None
        }
    }
}

impl Pipeline {
    pub(crate) async fn emit_contact(&self, contact: &Contact, action: EntityAction) {
        let Some(payload) = to_payload(contact) else {
            return;
        };
        self.notifier
            .emit(RoomEvent::new(
                contact.tenant_id,
                vec![notification_room(contact.tenant_id)],
                fanout::CONTACT,
                action,
                payload,
            ))
            .await;
    }

    /// Announce a contact that no longer exists (the losing side of a merge
    /// or a reconciled placeholder's parent has no row to serialize).
    pub(crate) async fn emit_contact_deleted(&self, tenant_id: i64, contact_id: i64) {
        self.notifier
            .emit(RoomEvent::new(
                tenant_id,
                vec![notification_room(tenant_id)],
                fanout::CONTACT,
                EntityAction::Delete,
                serde_json::json!({ "contactId": contact_id }),
            ))
            .await;
    }

    pub(crate) async fn emit_ticket(&self, ticket: &Ticket, action: EntityAction) {
        let Some(payload) = to_payload(ticket) else {
            return;
        };
        self.notifier
            .emit(RoomEvent::new(
                ticket.tenant_id,
                vec![
                    status_room(ticket.tenant_id, ticket.status),
                    ticket_room(ticket.tenant_id, ticket.id),
                    notification_room(ticket.tenant_id),
                ],
                fanout::TICKET,
                action,
                payload,
            ))
            .await;
    }

    /// Message fan-out addressed through the owning ticket's rooms.
    pub(crate) async fn emit_message(&self, ticket: &Ticket, payload: Value, action: EntityAction) {
        self.notifier
            .emit(RoomEvent::new(
                ticket.tenant_id,
                vec![
                    status_room(ticket.tenant_id, ticket.status),
                    ticket_room(ticket.tenant_id, ticket.id),
                    notification_room(ticket.tenant_id),
                ],
                fanout::MESSAGE,
                action,
                payload,
            ))
            .await;
    }

    pub(crate) async fn emit_session(&self, tenant_id: i64, payload: Value) {
        self.notifier
            .emit(RoomEvent::new(
                tenant_id,
                vec![notification_room(tenant_id)],
                fanout::SESSION,
                EntityAction::Update,
                payload,
            ))
            .await;
    }
}
