// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row models for storage entities.
//!
//! Serialization uses the wire casing so rows can be embedded directly in
//! fan-out payloads.

use serde::{Deserialize, Serialize};

use deskwire_core::types::TicketStatus;

/// One tenant of the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    /// Overrides `ingest.reopen_window_minutes` when set.
    pub reopen_window_minutes: Option<i64>,
    pub created_at: String,
}

/// One configured messaging endpoint (a "session" in engine terms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    /// Engine routing token used in command subjects.
    pub engine: String,
    pub status: String,
    pub qrcode: Option<String>,
    pub pairing_code: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Tenant-scoped identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: i64,
    pub tenant_id: i64,
    pub identifier: Option<String>,
    pub lid: Option<String>,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_group: bool,
    /// JSON array of `{name, value}` pairs.
    pub extra_info: String,
    pub owner_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// One conversation thread between a contact and a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub tenant_id: i64,
    pub contact_id: i64,
    pub connection_id: i64,
    pub status: TicketStatus,
    pub is_group: bool,
    pub unread_count: i64,
    pub last_message: String,
    pub owner_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// One stored message, keyed by its wire id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub ticket_id: i64,
    /// The sender contact.
    pub contact_id: i64,
    pub tenant_id: i64,
    pub body: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub from_me: bool,
    pub ack: i64,
    pub is_read: bool,
    pub quoted_msg_id: Option<String>,
    /// Structured engine payload, stored verbatim as JSON.
    pub raw_payload: Option<String>,
    /// JSON array of reaction objects.
    pub reactions: String,
    pub is_deleted: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_serializes_wire_casing() {
        let ticket = Ticket {
            id: 1,
            tenant_id: 42,
            contact_id: 7,
            connection_id: 3,
            status: TicketStatus::Pending,
            is_group: false,
            unread_count: 2,
            last_message: "hi".to_string(),
            owner_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let v = serde_json::to_value(&ticket).unwrap();
        assert_eq!(v["tenantId"], 42);
        assert_eq!(v["unreadCount"], 2);
        assert_eq!(v["status"], "pending");
    }

    #[test]
    fn message_serializes_wire_casing() {
        let msg = Message {
            id: "wa-1".to_string(),
            ticket_id: 9,
            contact_id: 7,
            tenant_id: 42,
            body: "hello".to_string(),
            media_url: None,
            media_type: None,
            from_me: true,
            ack: 2,
            is_read: false,
            quoted_msg_id: None,
            raw_payload: None,
            reactions: "[]".to_string(),
            is_deleted: false,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["fromMe"], true);
        assert_eq!(v["quotedMsgId"], serde_json::Value::Null);
        assert_eq!(v["ticketId"], 9);
    }
}
