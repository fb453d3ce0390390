// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope dispatch: the pipeline as the broker's handler.

use async_trait::async_trait;
use metrics::counter;
use tracing::warn;

use deskwire_core::DeskwireError;
use deskwire_core::envelope::{DecodeError, Envelope, InboundEvent};
use deskwire_core::traits::EnvelopeHandler;

use crate::pipeline::Pipeline;

#[async_trait]
impl EnvelopeHandler for Pipeline {
    async fn handle(&self, envelope: Envelope) -> Result<(), DeskwireError> {
        let tenant_id = envelope.tenant_id;
        let event = match InboundEvent::decode(&envelope) {
            Ok(event) => event,
            Err(DecodeError::UnknownType(event_type)) => {
                // Not an error: engines may speak a newer dialect.
                warn!(tenant_id, event_type, "unknown envelope type, dropping");
                counter!("deskwire_envelopes_unknown_total").increment(1);
                return Ok(());
            }
            Err(e @ DecodeError::Payload { .. }) => {
                return Err(DeskwireError::Envelope(e.to_string()));
            }
        };

        match event {
            InboundEvent::SessionQrcode(e) => self.handle_qrcode(tenant_id, e).await,
            InboundEvent::SessionPairingCode(e) => self.handle_pairing_code(tenant_id, e).await,
            InboundEvent::SessionStatus(e) => self.handle_status(tenant_id, e).await,
            InboundEvent::MessageReceived(e) => self.handle_message_received(tenant_id, *e).await,
            InboundEvent::MessageAck(e) => self.handle_ack(tenant_id, e).await,
            InboundEvent::MessageReaction(e) => self.handle_reaction(tenant_id, e).await,
            InboundEvent::MessageRevoke(e) => self.handle_revoke(tenant_id, e).await,
            InboundEvent::ContactUpdate(e) => {
                self.resolve_contact(tenant_id, &e.contact).await?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CONNECTION, TENANT, testbed};
    use deskwire_core::envelope::event_types;
    use deskwire_storage::queries::messages;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_type_is_dropped_without_error() {
        let bed = testbed().await;
        let envelope = Envelope::new(TENANT, "campaign.fired", json!({}));
        bed.pipeline.handle(envelope).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let bed = testbed().await;
        let envelope = Envelope::new(
            TENANT,
            event_types::MESSAGE_ACK,
            json!({"sessionId": "not a number"}),
        );
        assert!(bed.pipeline.handle(envelope).await.is_err());
    }

    #[tokio::test]
    async fn message_received_envelope_lands_in_storage() {
        let bed = testbed().await;
        let envelope = Envelope::new(
            TENANT,
            event_types::MESSAGE_RECEIVED,
            json!({
                "sessionId": CONNECTION,
                "message": {
                    "id": "wa-1",
                    "body": "hello",
                    "timestamp": chrono::Utc::now().timestamp_millis(),
                },
                "contact": {"identifier": "5511999@c.us", "name": "Ana"},
            }),
        );
        bed.pipeline.handle(envelope).await.unwrap();

        let stored = messages::get_message(bed.pipeline.db(), "wa-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.body, "hello");
    }

    #[tokio::test]
    async fn contact_update_envelope_resolves_contact() {
        let bed = testbed().await;
        let envelope = Envelope::new(
            TENANT,
            event_types::CONTACT_UPDATE,
            json!({
                "sessionId": CONNECTION,
                "contact": {"identifier": "5511999@c.us", "name": "Ana"},
            }),
        );
        bed.pipeline.handle(envelope).await.unwrap();
        assert_eq!(bed.notifier.events_of("contact").len(), 1);
    }
}
