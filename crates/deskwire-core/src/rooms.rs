// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room naming for the real-time fan-out contract.
//!
//! Every contact/ticket/message mutation is announced to rooms keyed by
//! tenant + ticket status, tenant + ticket id, and a per-tenant
//! "notification" room. UI clients subscribe to rooms by name.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{EntityAction, TicketStatus};

/// Fan-out event names, one per mutated entity kind.
pub mod fanout {
    pub const TICKET: &str = "ticket";
    pub const MESSAGE: &str = "message";
    pub const CONTACT: &str = "contact";
    pub const SESSION: &str = "session";
}

/// Room receiving every ticket in a given status for a tenant.
pub fn status_room(tenant_id: i64, status: TicketStatus) -> String {
    format!("{tenant_id}-{}", status.as_str())
}

/// Room scoped to a single ticket.
pub fn ticket_room(tenant_id: i64, ticket_id: i64) -> String {
    format!("{tenant_id}-{ticket_id}")
}

/// Tenant-wide notification room.
pub fn notification_room(tenant_id: i64) -> String {
    format!("{tenant_id}-notification")
}

/// One room-scoped notification as delivered to UI clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEvent {
    pub tenant_id: i64,
    /// Rooms this event is addressed to.
    pub rooms: Vec<String>,
    /// One of the [`fanout`] event names.
    pub event: String,
    pub action: EntityAction,
    /// The affected entity (and related records) as JSON.
    pub payload: Value,
}

impl RoomEvent {
    pub fn new(
        tenant_id: i64,
        rooms: Vec<String>,
        event: &str,
        action: EntityAction,
        payload: Value,
    ) -> Self {
        Self {
            tenant_id,
            rooms,
            event: event.to_string(),
            action,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn room_name_formats() {
        assert_eq!(status_room(42, TicketStatus::Open), "42-open");
        assert_eq!(status_room(42, TicketStatus::Pending), "42-pending");
        assert_eq!(ticket_room(42, 319), "42-319");
        assert_eq!(notification_room(42), "42-notification");
    }

    #[test]
    fn room_event_serializes_action_lowercase() {
        let ev = RoomEvent::new(
            1,
            vec![notification_room(1)],
            fanout::TICKET,
            EntityAction::Delete,
            json!({"ticketId": 9}),
        );
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["action"], "delete");
        assert_eq!(v["event"], "ticket");
        assert_eq!(v["rooms"][0], "1-notification");
    }
}
