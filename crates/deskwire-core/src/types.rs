// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Deskwire workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a ticket.
///
/// At most one ticket per (contact, connection, tenant) may be in
/// `Pending` or `Open` at any time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Waiting in the shared queue; no agent has accepted it.
    Pending,
    /// Accepted by an agent (or a group conversation, which skips the accept step).
    Open,
    Closed,
}

impl TicketStatus {
    /// Stable string form used in SQL and room names.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Open => "open",
            TicketStatus::Closed => "closed",
        }
    }
}

/// Connection state reported by engines via `session.status` events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Connected,
    Disconnected,
    Qrcode,
    Opening,
    Pairing,
    Timeout,
    SessionExpired,
}

/// Lowest delivery-acknowledgment level.
pub const ACK_MIN: i64 = 0;
/// Highest delivery-acknowledgment level (played).
pub const ACK_MAX: i64 = 5;

/// Clamp a wire ack ordinal into the valid 0..=5 range.
pub fn clamp_ack(ack: i64) -> i64 {
    ack.clamp(ACK_MIN, ACK_MAX)
}

/// Mutation kind carried by every room-scoped fan-out notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityAction {
    Create,
    Update,
    Delete,
}

/// Best-effort session status snapshot cached in the coordination store.
///
/// Advisory only: the connections table is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// RFC 3339 timestamp of the status event that produced this snapshot.
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn ticket_status_round_trips() {
        for status in [TicketStatus::Pending, TicketStatus::Open, TicketStatus::Closed] {
            let s = status.to_string();
            assert_eq!(s, status.as_str());
            assert_eq!(TicketStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn session_status_uses_wire_casing() {
        assert_eq!(SessionStatus::Connected.to_string(), "CONNECTED");
        assert_eq!(SessionStatus::SessionExpired.to_string(), "SESSION_EXPIRED");
        assert_eq!(
            SessionStatus::from_str("QRCODE").unwrap(),
            SessionStatus::Qrcode
        );
    }

    #[test]
    fn session_status_serde_matches_strum() {
        let json = serde_json::to_string(&SessionStatus::SessionExpired).unwrap();
        assert_eq!(json, "\"SESSION_EXPIRED\"");
        let parsed: SessionStatus = serde_json::from_str("\"DISCONNECTED\"").unwrap();
        assert_eq!(parsed, SessionStatus::Disconnected);
    }

    #[test]
    fn ack_clamps_to_ordinal_range() {
        assert_eq!(clamp_ack(-1), 0);
        assert_eq!(clamp_ack(3), 3);
        assert_eq!(clamp_ack(9), 5);
    }

    #[test]
    fn entity_action_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&EntityAction::Create).unwrap(),
            "\"create\""
        );
        assert_eq!(EntityAction::Delete.to_string(), "delete");
    }

    #[test]
    fn session_snapshot_round_trips() {
        let snap = SessionSnapshot {
            status: SessionStatus::Connected,
            detail: None,
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("detail"));
        let back: SessionSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
