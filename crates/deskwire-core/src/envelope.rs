// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The envelope protocol spoken over the broker.
//!
//! Every command (core -> engine) and event (engine -> core) is an
//! [`Envelope`]: a globally unique id, a millisecond timestamp, the tenant,
//! a `type` string naming the business event, and a JSON payload. Payloads
//! are decoded in a second step into the [`InboundEvent`] tagged union so
//! the dispatcher can match exhaustively and drop unknown types explicitly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::error::DeskwireError;
use crate::types::SessionStatus;

/// Envelope `type` strings for events emitted by engines.
pub mod event_types {
    pub const SESSION_QRCODE: &str = "session.qrcode";
    pub const SESSION_PAIRING_CODE: &str = "session.pairingcode";
    pub const SESSION_STATUS: &str = "session.status";
    pub const MESSAGE_RECEIVED: &str = "message.received";
    pub const MESSAGE_ACK: &str = "message.ack";
    pub const MESSAGE_REACTION: &str = "message.reaction";
    pub const MESSAGE_REVOKE: &str = "message.revoke";
    pub const CONTACT_UPDATE: &str = "contact.update";
}

/// Envelope `type` strings for commands published to engines.
pub mod command_types {
    pub const SESSION_START: &str = "session.start";
    pub const SESSION_STOP: &str = "session.stop";
    pub const SEND_TEXT: &str = "message.send.text";
    pub const SEND_MEDIA: &str = "message.send.media";
    pub const SEND_BUTTONS: &str = "message.send.buttons";
    pub const SEND_LIST: &str = "message.send.list";
    pub const SEND_POLL: &str = "message.send.poll";
    pub const SEND_CAROUSEL: &str = "message.send.carousel";
    pub const SEND_INTERACTIVE: &str = "message.send.interactive";
    pub const MARK_AS_READ: &str = "message.markAsRead";
    pub const CONTACT_SYNC: &str = "contact.sync";
    pub const HISTORY_SYNC: &str = "history.sync";
}

/// The uniform broker message shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Globally unique envelope id (UUID v4).
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub tenant_id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Value,
}

impl Envelope {
    /// Build a new envelope with a fresh id and the current timestamp.
    pub fn new(tenant_id: i64, event_type: &str, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            tenant_id,
            event_type: event_type.to_string(),
            payload,
        }
    }

    /// Serialize for publishing.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DeskwireError> {
        serde_json::to_vec(self).map_err(|e| DeskwireError::Envelope(e.to_string()))
    }

    /// Deserialize a broker payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeskwireError> {
        serde_json::from_slice(bytes).map_err(|e| DeskwireError::Envelope(e.to_string()))
    }
}

/// Why an envelope payload could not be turned into an [`InboundEvent`].
///
/// `UnknownType` is the dispatcher's log-and-drop branch; `Payload` is a
/// handler failure (terminal nack).
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown envelope type `{0}`")]
    UnknownType(String),
    #[error("malformed `{event_type}` payload: {source}")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Contact profile fields as they arrive on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireContact {
    /// Phone-derived identifier. Absent when only a LID is known.
    #[serde(default)]
    pub identifier: Option<String>,
    /// Stable alternate identifier.
    #[serde(default)]
    pub lid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub extra_info: Vec<ExtraInfo>,
}

/// One key/value pair of contact extra info.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraInfo {
    pub name: String,
    pub value: String,
}

/// Message fields as delivered by an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Provider-assigned id, or the client-generated id for echoed sends.
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from_me: bool,
    /// Milliseconds since the Unix epoch. Missing or non-positive values
    /// are treated as historical.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub quoted_msg_id: Option<String>,
    /// Placeholder id this message confirms, when the send originated here.
    #[serde(default)]
    pub original_id: Option<String>,
    #[serde(default)]
    pub ack: i64,
    /// Group participant JID for messages inside a group conversation.
    #[serde(default)]
    pub participant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrcodeEvent {
    pub session_id: i64,
    pub qrcode: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingCodeEvent {
    pub session_id: i64,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub session_id: i64,
    pub status: SessionStatus,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Payload of `message.received`: the message plus the conversation peer
/// (a group contact for group chats) and, inside groups, the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceivedEvent {
    pub session_id: i64,
    pub message: WireMessage,
    pub contact: WireContact,
    #[serde(default)]
    pub participant: Option<WireContact>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckEvent {
    pub session_id: i64,
    pub message_id: String,
    pub ack: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEvent {
    pub session_id: i64,
    pub message_id: String,
    pub reaction: String,
    #[serde(default)]
    pub sender: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeEvent {
    pub session_id: i64,
    pub message_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdateEvent {
    pub session_id: i64,
    pub contact: WireContact,
}

/// Tagged union over every inbound envelope type the core understands.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    SessionQrcode(QrcodeEvent),
    SessionPairingCode(PairingCodeEvent),
    SessionStatus(StatusEvent),
    MessageReceived(Box<MessageReceivedEvent>),
    MessageAck(AckEvent),
    MessageReaction(ReactionEvent),
    MessageRevoke(RevokeEvent),
    ContactUpdate(ContactUpdateEvent),
}

impl InboundEvent {
    /// Decode an envelope payload by its `type` string.
    pub fn decode(envelope: &Envelope) -> Result<Self, DecodeError> {
        fn parse<T: serde::de::DeserializeOwned>(
            event_type: &str,
            payload: &Value,
        ) -> Result<T, DecodeError> {
            serde_json::from_value(payload.clone()).map_err(|source| DecodeError::Payload {
                event_type: event_type.to_string(),
                source,
            })
        }

        let t = envelope.event_type.as_str();
        let p = &envelope.payload;
        match t {
            event_types::SESSION_QRCODE => Ok(Self::SessionQrcode(parse(t, p)?)),
            event_types::SESSION_PAIRING_CODE => Ok(Self::SessionPairingCode(parse(t, p)?)),
            event_types::SESSION_STATUS => Ok(Self::SessionStatus(parse(t, p)?)),
            event_types::MESSAGE_RECEIVED => Ok(Self::MessageReceived(Box::new(parse(t, p)?))),
            event_types::MESSAGE_ACK => Ok(Self::MessageAck(parse(t, p)?)),
            event_types::MESSAGE_REACTION => Ok(Self::MessageReaction(parse(t, p)?)),
            event_types::MESSAGE_REVOKE => Ok(Self::MessageRevoke(parse(t, p)?)),
            event_types::CONTACT_UPDATE => Ok(Self::ContactUpdate(parse(t, p)?)),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }

    /// The connection this event belongs to.
    pub fn session_id(&self) -> i64 {
        match self {
            InboundEvent::SessionQrcode(e) => e.session_id,
            InboundEvent::SessionPairingCode(e) => e.session_id,
            InboundEvent::SessionStatus(e) => e.session_id,
            InboundEvent::MessageReceived(e) => e.session_id,
            InboundEvent::MessageAck(e) => e.session_id,
            InboundEvent::MessageReaction(e) => e.session_id,
            InboundEvent::MessageRevoke(e) => e.session_id,
            InboundEvent::ContactUpdate(e) => e.session_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSession {
    pub session_id: i64,
    #[serde(default)]
    pub use_pairing_code: bool,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub sync_full_history: bool,
    /// Restart the engine session even if one is already established.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopSession {
    pub session_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendText {
    pub session_id: i64,
    /// Client-generated placeholder id echoed back as `originalId`.
    pub message_id: String,
    /// Destination identifier (individual or group).
    pub to: String,
    pub body: String,
    #[serde(default)]
    pub quoted_msg_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMedia {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub url: String,
    pub media_type: String,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendButtons {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub body: String,
    pub buttons: Vec<Button>,
    #[serde(default)]
    pub footer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSection {
    pub title: String,
    pub rows: Vec<ListRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendList {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub title: String,
    pub body: String,
    pub button_text: String,
    pub sections: Vec<ListSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendPoll {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub name: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub multiple_answers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselCard {
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub footer: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCarousel {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub body: String,
    pub cards: Vec<CarouselCard>,
}

/// Raw interactive/native-flow content is passed through untyped; its shape
/// is owned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendInteractive {
    pub session_id: i64,
    pub message_id: String,
    pub to: String,
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsRead {
    pub session_id: i64,
    pub to: String,
    pub message_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSync {
    pub session_id: i64,
    /// Restrict the sync to one contact (used while a caller waits on
    /// enrichment); absent means a full roster sync.
    #[serde(default)]
    pub identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySync {
    pub session_id: i64,
    #[serde(default)]
    pub days: Option<i64>,
}

/// Every command the core can publish to an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SessionStart(StartSession),
    SessionStop(StopSession),
    SendText(SendText),
    SendMedia(SendMedia),
    SendButtons(SendButtons),
    SendList(SendList),
    SendPoll(SendPoll),
    SendCarousel(SendCarousel),
    SendInteractive(SendInteractive),
    MarkAsRead(MarkAsRead),
    ContactSync(ContactSync),
    HistorySync(HistorySync),
}

impl Command {
    /// The envelope `type` string for this command.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SessionStart(_) => command_types::SESSION_START,
            Command::SessionStop(_) => command_types::SESSION_STOP,
            Command::SendText(_) => command_types::SEND_TEXT,
            Command::SendMedia(_) => command_types::SEND_MEDIA,
            Command::SendButtons(_) => command_types::SEND_BUTTONS,
            Command::SendList(_) => command_types::SEND_LIST,
            Command::SendPoll(_) => command_types::SEND_POLL,
            Command::SendCarousel(_) => command_types::SEND_CAROUSEL,
            Command::SendInteractive(_) => command_types::SEND_INTERACTIVE,
            Command::MarkAsRead(_) => command_types::MARK_AS_READ,
            Command::ContactSync(_) => command_types::CONTACT_SYNC,
            Command::HistorySync(_) => command_types::HISTORY_SYNC,
        }
    }

    /// The connection this command is routed to.
    pub fn session_id(&self) -> i64 {
        match self {
            Command::SessionStart(c) => c.session_id,
            Command::SessionStop(c) => c.session_id,
            Command::SendText(c) => c.session_id,
            Command::SendMedia(c) => c.session_id,
            Command::SendButtons(c) => c.session_id,
            Command::SendList(c) => c.session_id,
            Command::SendPoll(c) => c.session_id,
            Command::SendCarousel(c) => c.session_id,
            Command::SendInteractive(c) => c.session_id,
            Command::MarkAsRead(c) => c.session_id,
            Command::ContactSync(c) => c.session_id,
            Command::HistorySync(c) => c.session_id,
        }
    }

    /// Wrap this command in an envelope ready for publishing.
    pub fn to_envelope(&self, tenant_id: i64) -> Result<Envelope, DeskwireError> {
        let payload = match self {
            Command::SessionStart(c) => serde_json::to_value(c),
            Command::SessionStop(c) => serde_json::to_value(c),
            Command::SendText(c) => serde_json::to_value(c),
            Command::SendMedia(c) => serde_json::to_value(c),
            Command::SendButtons(c) => serde_json::to_value(c),
            Command::SendList(c) => serde_json::to_value(c),
            Command::SendPoll(c) => serde_json::to_value(c),
            Command::SendCarousel(c) => serde_json::to_value(c),
            Command::SendInteractive(c) => serde_json::to_value(c),
            Command::MarkAsRead(c) => serde_json::to_value(c),
            Command::ContactSync(c) => serde_json::to_value(c),
            Command::HistorySync(c) => serde_json::to_value(c),
        }
        .map_err(|e| DeskwireError::Envelope(e.to_string()))?;
        Ok(Envelope::new(tenant_id, self.kind(), payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_uses_wire_field_names() {
        let env = Envelope::new(42, event_types::MESSAGE_ACK, json!({"sessionId": 7}));
        let v = serde_json::to_value(&env).unwrap();
        assert!(v.get("tenantId").is_some());
        assert_eq!(v["type"], event_types::MESSAGE_ACK);
        assert!(v.get("event_type").is_none());
        assert!(env.timestamp > 0);
    }

    #[test]
    fn envelope_bytes_round_trip() {
        let env = Envelope::new(1, event_types::SESSION_QRCODE, json!({"sessionId": 3, "qrcode": "abc"}));
        let bytes = env.to_bytes().unwrap();
        let back = Envelope::from_bytes(&bytes).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn decode_status_event() {
        let env = Envelope::new(
            42,
            event_types::SESSION_STATUS,
            json!({"sessionId": 7, "status": "CONNECTED"}),
        );
        match InboundEvent::decode(&env).unwrap() {
            InboundEvent::SessionStatus(e) => {
                assert_eq!(e.session_id, 7);
                assert_eq!(e.status, SessionStatus::Connected);
                assert!(e.detail.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_message_received_with_defaults() {
        let env = Envelope::new(
            42,
            event_types::MESSAGE_RECEIVED,
            json!({
                "sessionId": 7,
                "message": {"id": "wa-1", "body": "hi", "timestamp": 1_700_000_000_000i64},
                "contact": {"identifier": "5511999@c.us", "name": "Ana"}
            }),
        );
        match InboundEvent::decode(&env).unwrap() {
            InboundEvent::MessageReceived(e) => {
                assert_eq!(e.message.id, "wa-1");
                assert!(!e.message.from_me);
                assert_eq!(e.message.ack, 0);
                assert!(e.message.original_id.is_none());
                assert_eq!(e.contact.identifier.as_deref(), Some("5511999@c.us"));
                assert!(!e.contact.is_group);
                assert!(e.participant.is_none());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn decode_unknown_type_is_distinct() {
        let env = Envelope::new(1, "campaign.fired", json!({}));
        match InboundEvent::decode(&env) {
            Err(DecodeError::UnknownType(t)) => assert_eq!(t, "campaign.fired"),
            other => panic!("expected UnknownType, got {other:?}"),
        }
    }

    #[test]
    fn decode_malformed_payload_reports_type() {
        let env = Envelope::new(1, event_types::MESSAGE_ACK, json!({"sessionId": "seven"}));
        match InboundEvent::decode(&env) {
            Err(DecodeError::Payload { event_type, .. }) => {
                assert_eq!(event_type, event_types::MESSAGE_ACK);
            }
            other => panic!("expected Payload error, got {other:?}"),
        }
    }

    #[test]
    fn command_envelope_carries_kind_and_payload() {
        let cmd = Command::SessionStart(StartSession {
            session_id: 7,
            use_pairing_code: true,
            phone: Some("5511999999999".to_string()),
            sync_full_history: false,
            force: false,
        });
        let env = cmd.to_envelope(42).unwrap();
        assert_eq!(env.tenant_id, 42);
        assert_eq!(env.event_type, command_types::SESSION_START);
        assert_eq!(env.payload["sessionId"], 7);
        assert_eq!(env.payload["usePairingCode"], true);
        assert_eq!(cmd.session_id(), 7);
    }

    #[test]
    fn send_text_payload_uses_camel_case() {
        let cmd = Command::SendText(SendText {
            session_id: 3,
            message_id: "client-1".to_string(),
            to: "5511888@c.us".to_string(),
            body: "hello".to_string(),
            quoted_msg_id: None,
        });
        let env = cmd.to_envelope(1).unwrap();
        assert_eq!(env.payload["messageId"], "client-1");
        assert!(env.payload.get("quotedMsgId").is_some());
    }

    #[test]
    fn every_inbound_event_reports_its_session() {
        let ack = InboundEvent::MessageAck(AckEvent {
            session_id: 9,
            message_id: "m".to_string(),
            ack: 2,
        });
        assert_eq!(ack.session_id(), 9);
        let revoke = InboundEvent::MessageRevoke(RevokeEvent {
            session_id: 11,
            message_id: "m".to_string(),
        });
        assert_eq!(revoke.session_id(), 11);
    }
}
