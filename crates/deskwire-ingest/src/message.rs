// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ingestion: idempotent upserts, optimistic-UI placeholder
//! reconciliation, and historical archival.
//!
//! Engines deliver at-least-once and out of order. Correctness comes from
//! the message id being the primary key: redelivery of a stored id only
//! raises the ack level and backfills media, never double-counts unread.

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use metrics::counter;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::{AckEvent, MessageReceivedEvent, ReactionEvent, RevokeEvent, WireMessage};
use deskwire_core::types::{EntityAction, TicketStatus, clamp_ack};
use deskwire_storage::models::{Message, Ticket};
use deskwire_storage::queries::{messages, tickets};

use crate::pipeline::Pipeline;

fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn preview_of(message: &WireMessage) -> String {
    if message.body.is_empty() {
        message
            .media_type
            .clone()
            .unwrap_or_else(|| "media".to_string())
    } else {
        message.body.clone()
    }
}

impl Pipeline {
    /// Handle `message.received`.
    pub async fn handle_message_received(
        &self,
        tenant_id: i64,
        event: MessageReceivedEvent,
    ) -> Result<(), DeskwireError> {
        let wire = &event.message;

        // Redelivery of a stored id: ack and media only, never unread.
        if let Some(existing) = messages::get_message(&self.db, &wire.id).await? {
            return self.apply_redelivery(&existing, wire).await;
        }

        // The conversation peer owns the ticket; inside a group the
        // participant authored the message.
        let peer = self.resolve_contact(tenant_id, &event.contact).await?;
        let sender = match &event.participant {
            Some(participant) => self.resolve_contact(tenant_id, participant).await?,
            None => peer.clone(),
        };

        let quoted_msg_id = self.validated_quote(wire.quoted_msg_id.as_deref()).await?;

        // A confirming event for a placeholder inherits its timeline slot.
        if let Some(original_id) = wire.original_id.as_deref() {
            if original_id != wire.id {
                if let Some(placeholder) = messages::get_message(&self.db, original_id).await? {
                    return self
                        .reconcile_placeholder(placeholder, wire, quoted_msg_id)
                        .await;
                }
            }
        }

        if self.is_historical(wire.timestamp) {
            return self
                .archive_historical(tenant_id, &peer, &sender, event.session_id, wire, quoted_msg_id)
                .await;
        }

        let preview = preview_of(wire);
        let ticket = self
            .resolve_ticket(tenant_id, &peer, event.session_id, wire.from_me, &preview)
            .await?;
        let stored = self
            .insert_from_wire(&ticket, sender.id, wire, quoted_msg_id, None)
            .await?;
        counter!("deskwire_messages_ingested_total").increment(1);
        self.emit_message(
            &ticket,
            serde_json::to_value(&stored).unwrap_or_default(),
            EntityAction::Create,
        )
        .await;
        Ok(())
    }

    async fn apply_redelivery(
        &self,
        existing: &Message,
        wire: &WireMessage,
    ) -> Result<(), DeskwireError> {
        debug!(message_id = %existing.id, "redelivered message, updating ack/media only");
        messages::update_ack_if_higher(&self.db, &existing.id, clamp_ack(wire.ack)).await?;
        if existing.media_url.is_none() {
            if let Some(url) = wire.media_url.as_deref().filter(|u| !u.is_empty()) {
                messages::update_media(&self.db, &existing.id, url, wire.media_type.as_deref())
                    .await?;
            }
        }
        if let Some(updated) = messages::get_message(&self.db, &existing.id).await? {
            if let Some(ticket) = tickets::get_ticket(&self.db, updated.ticket_id).await? {
                self.emit_message(
                    &ticket,
                    serde_json::to_value(&updated).unwrap_or_default(),
                    EntityAction::Update,
                )
                .await;
            }
        }
        Ok(())
    }

    /// A quoted reference to a message we never stored is cleared, not
    /// rejected.
    pub(crate) async fn validated_quote(
        &self,
        quoted_msg_id: Option<&str>,
    ) -> Result<Option<String>, DeskwireError> {
        match quoted_msg_id {
            Some(id) if !id.is_empty() => {
                if messages::message_exists(&self.db, id).await? {
                    Ok(Some(id.to_string()))
                } else {
                    warn!(quoted_msg_id = id, "unknown quoted message, clearing reference");
                    Ok(None)
                }
            }
            _ => Ok(None),
        }
    }

    /// Replace a placeholder with the final provider-assigned row. The
    /// placeholder's body/media/createdAt take precedence over the event's
    /// own fields so the optimistic UI row survives the id swap.
    async fn reconcile_placeholder(
        &self,
        placeholder: Message,
        wire: &WireMessage,
        quoted_msg_id: Option<String>,
    ) -> Result<(), DeskwireError> {
        info!(
            placeholder_id = %placeholder.id,
            final_id = %wire.id,
            "reconciling placeholder with provider id"
        );

        let ticket = tickets::get_ticket(&self.db, placeholder.ticket_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "ticket",
                id: placeholder.ticket_id.to_string(),
            })?;

        let body = if placeholder.body.is_empty() {
            wire.body.clone()
        } else {
            placeholder.body.clone()
        };
        let media_url = placeholder.media_url.clone().or_else(|| wire.media_url.clone());
        let media_type = placeholder
            .media_type
            .clone()
            .or_else(|| wire.media_type.clone());

        messages::delete_message(&self.db, &placeholder.id).await?;
        self.emit_message(
            &ticket,
            serde_json::json!({ "id": placeholder.id, "ticketId": ticket.id }),
            EntityAction::Delete,
        )
        .await;

        let stored = messages::insert_message(
            &self.db,
            messages::NewMessage {
                id: wire.id.clone(),
                ticket_id: placeholder.ticket_id,
                contact_id: placeholder.contact_id,
                tenant_id: placeholder.tenant_id,
                body,
                media_url,
                media_type,
                from_me: true,
                ack: clamp_ack(wire.ack.max(placeholder.ack)),
                is_read: placeholder.is_read,
                quoted_msg_id: quoted_msg_id.or(placeholder.quoted_msg_id),
                raw_payload: serde_json::to_string(wire).ok(),
                created_at: Some(placeholder.created_at),
            },
        )
        .await?;
        self.emit_message(
            &ticket,
            serde_json::to_value(&stored).unwrap_or_default(),
            EntityAction::Create,
        )
        .await;
        Ok(())
    }

    /// Whether a wire timestamp marks the message as history rather than
    /// live traffic. Missing or non-positive stamps are implausible and,
    /// with no placeholder to inherit from, also land in the archive.
    fn is_historical(&self, timestamp: Option<i64>) -> bool {
        match timestamp {
            Some(ts) if ts > 0 => {
                let cutoff =
                    Utc::now() - ChronoDuration::hours(self.settings.historical_cutoff_hours);
                match DateTime::<Utc>::from_timestamp_millis(ts) {
                    Some(dt) => dt < cutoff,
                    None => true,
                }
            }
            _ => true,
        }
    }

    /// Store a backfilled message without disturbing ticket lifecycle: the
    /// most recent ticket (any status) absorbs it, and a `closed` holder
    /// is created when the contact has none.
    async fn archive_historical(
        &self,
        tenant_id: i64,
        peer: &deskwire_storage::models::Contact,
        sender: &deskwire_storage::models::Contact,
        connection_id: i64,
        wire: &WireMessage,
        quoted_msg_id: Option<String>,
    ) -> Result<(), DeskwireError> {
        let ticket = match tickets::find_latest_ticket(&self.db, tenant_id, peer.id, connection_id, None)
            .await?
        {
            Some(ticket) => ticket,
            None => {
                let ticket = tickets::create_ticket(
                    &self.db,
                    tickets::NewTicket {
                        tenant_id,
                        contact_id: peer.id,
                        connection_id,
                        status: TicketStatus::Closed,
                        is_group: peer.is_group,
                        unread_count: 0,
                        last_message: preview_of(wire),
                    },
                )
                .await?;
                self.emit_ticket(&ticket, EntityAction::Create).await;
                ticket
            }
        };

        let created_at = wire.timestamp.filter(|ts| *ts > 0).and_then(millis_to_rfc3339);
        let stored = self
            .insert_from_wire(&ticket, sender.id, wire, quoted_msg_id, created_at)
            .await?;
        // History only refreshes the preview; counters and status stay.
        tickets::touch_preview(&self.db, ticket.id, &preview_of(wire)).await?;
        counter!("deskwire_messages_archived_total").increment(1);
        debug!(message_id = %stored.id, ticket_id = ticket.id, "historical message archived");
        self.emit_message(
            &ticket,
            serde_json::to_value(&stored).unwrap_or_default(),
            EntityAction::Create,
        )
        .await;
        Ok(())
    }

    async fn insert_from_wire(
        &self,
        ticket: &Ticket,
        sender_contact_id: i64,
        wire: &WireMessage,
        quoted_msg_id: Option<String>,
        created_at: Option<String>,
    ) -> Result<Message, DeskwireError> {
        let created_at =
            created_at.or_else(|| wire.timestamp.filter(|ts| *ts > 0).and_then(millis_to_rfc3339));
        messages::insert_message(
            &self.db,
            messages::NewMessage {
                id: wire.id.clone(),
                ticket_id: ticket.id,
                contact_id: sender_contact_id,
                tenant_id: ticket.tenant_id,
                body: wire.body.clone(),
                media_url: wire.media_url.clone(),
                media_type: wire.media_type.clone(),
                from_me: wire.from_me,
                ack: clamp_ack(wire.ack),
                is_read: wire.from_me,
                quoted_msg_id,
                raw_payload: serde_json::to_string(wire).ok(),
                created_at,
            },
        )
        .await
    }

    /// Handle `message.ack`. The only retried handler: acks can overtake
    /// the insert of the message they confirm, so a miss is retried a few
    /// times before the envelope is given up on.
    pub async fn handle_ack(&self, _tenant_id: i64, event: AckEvent) -> Result<(), DeskwireError> {
        let ack = clamp_ack(event.ack);
        let attempts = self.settings.ack_retry_attempts.max(1);
        for attempt in 1..=attempts {
            if messages::update_ack_if_higher(&self.db, &event.message_id, ack).await? {
                if let Some(message) = messages::get_message(&self.db, &event.message_id).await? {
                    if let Some(ticket) = tickets::get_ticket(&self.db, message.ticket_id).await? {
                        self.emit_message(
                            &ticket,
                            serde_json::to_value(&message).unwrap_or_default(),
                            EntityAction::Update,
                        )
                        .await;
                    }
                }
                return Ok(());
            }
            debug!(
                message_id = %event.message_id,
                attempt,
                "ack arrived before message, retrying"
            );
            if attempt < attempts {
                sleep(self.settings.ack_retry_delay).await;
            }
        }
        Err(DeskwireError::NotFound {
            entity: "message",
            id: event.message_id,
        })
    }

    /// Handle `message.reaction`.
    pub async fn handle_reaction(
        &self,
        _tenant_id: i64,
        event: ReactionEvent,
    ) -> Result<(), DeskwireError> {
        if !messages::message_exists(&self.db, &event.message_id).await? {
            return Err(DeskwireError::NotFound {
                entity: "message",
                id: event.message_id,
            });
        }
        messages::append_reaction(
            &self.db,
            &event.message_id,
            serde_json::json!({
                "reaction": event.reaction,
                "sender": event.sender,
                "timestamp": event.timestamp,
            }),
        )
        .await?;
        self.emit_message_update(&event.message_id).await
    }

    /// Handle `message.revoke`: soft delete, the row stays for quoted
    /// references.
    pub async fn handle_revoke(
        &self,
        _tenant_id: i64,
        event: RevokeEvent,
    ) -> Result<(), DeskwireError> {
        if !messages::message_exists(&self.db, &event.message_id).await? {
            return Err(DeskwireError::NotFound {
                entity: "message",
                id: event.message_id,
            });
        }
        messages::mark_revoked(&self.db, &event.message_id).await?;
        self.emit_message_update(&event.message_id).await
    }

    async fn emit_message_update(&self, message_id: &str) -> Result<(), DeskwireError> {
        if let Some(message) = messages::get_message(&self.db, message_id).await? {
            if let Some(ticket) = tickets::get_ticket(&self.db, message.ticket_id).await? {
                self.emit_message(
                    &ticket,
                    serde_json::to_value(&message).unwrap_or_default(),
                    EntityAction::Update,
                )
                .await;
            }
        }
        Ok(())
    }
}
