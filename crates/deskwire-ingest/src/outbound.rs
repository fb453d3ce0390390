// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The producer side of message flow: outbound sends, read marking, and
//! proactive ticket opening.
//!
//! An outbound text creates a placeholder row under a client-generated id
//! before the command leaves the process; the confirming event later
//! reconciles it (see the `message` module).

use tracing::{debug, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::{Command, ContactSync, MarkAsRead, SendText, WireContact};
use deskwire_core::types::{EntityAction, TicketStatus};
use deskwire_storage::models::{Contact, Message, Ticket};
use deskwire_storage::queries::{contacts, messages, tickets};

use crate::pipeline::Pipeline;

fn placeholder_id() -> String {
    format!("dw-{}", uuid::Uuid::new_v4())
}

impl Pipeline {
    async fn ticket_for(&self, tenant_id: i64, ticket_id: i64) -> Result<Ticket, DeskwireError> {
        let ticket = tickets::get_ticket(&self.db, ticket_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "ticket",
                id: ticket_id.to_string(),
            })?;
        if ticket.tenant_id != tenant_id {
            return Err(DeskwireError::NotFound {
                entity: "ticket",
                id: ticket_id.to_string(),
            });
        }
        Ok(ticket)
    }

    /// Send a text into a ticket: placeholder row first, then the command.
    /// Returns the placeholder so callers can hand its id to the UI.
    pub async fn send_text(
        &self,
        tenant_id: i64,
        ticket_id: i64,
        body: &str,
        quoted_msg_id: Option<String>,
    ) -> Result<Message, DeskwireError> {
        let ticket = self.ticket_for(tenant_id, ticket_id).await?;
        let contact = contacts::get_contact(&self.db, ticket.contact_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "contact",
                id: ticket.contact_id.to_string(),
            })?;
        let connection = deskwire_storage::queries::connections::get_connection(
            &self.db,
            ticket.connection_id,
        )
        .await?
        .ok_or(DeskwireError::NotFound {
            entity: "connection",
            id: ticket.connection_id.to_string(),
        })?;
        let to = contact.identifier.clone().ok_or_else(|| {
            DeskwireError::Internal(format!("contact {} has no wire identifier", contact.id))
        })?;

        let quoted_msg_id = self.validated_quote(quoted_msg_id.as_deref()).await?;
        let placeholder = messages::insert_message(
            &self.db,
            messages::NewMessage {
                id: placeholder_id(),
                ticket_id: ticket.id,
                contact_id: contact.id,
                tenant_id,
                body: body.to_string(),
                from_me: true,
                is_read: true,
                quoted_msg_id: quoted_msg_id.clone(),
                ..messages::NewMessage::default()
            },
        )
        .await?;

        let command = Command::SendText(SendText {
            session_id: ticket.connection_id,
            message_id: placeholder.id.clone(),
            to,
            body: body.to_string(),
            quoted_msg_id,
        });
        if let Err(e) = self
            .publisher
            .publish(command.to_envelope(tenant_id)?, ticket.connection_id, &connection.engine)
            .await
        {
            // Nothing left the process; take the placeholder back out.
            warn!(ticket_id, error = %e, "send failed, removing placeholder");
            messages::delete_message(&self.db, &placeholder.id).await?;
            return Err(e);
        }

        tickets::reset_unread(&self.db, ticket.id, Some(body.to_string())).await?;
        debug!(ticket_id, placeholder_id = %placeholder.id, "outbound text dispatched");
        self.emit_message(
            &ticket,
            serde_json::to_value(&placeholder).unwrap_or_default(),
            EntityAction::Create,
        )
        .await;
        if let Some(updated) = tickets::get_ticket(&self.db, ticket.id).await? {
            self.emit_ticket(&updated, EntityAction::Update).await;
        }
        Ok(placeholder)
    }

    /// Reset the unread counter, mark inbound messages read, and tell the
    /// engine to send read receipts for them.
    pub async fn mark_ticket_read(
        &self,
        tenant_id: i64,
        ticket_id: i64,
    ) -> Result<(), DeskwireError> {
        let ticket = self.ticket_for(tenant_id, ticket_id).await?;
        let contact = contacts::get_contact(&self.db, ticket.contact_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "contact",
                id: ticket.contact_id.to_string(),
            })?;

        let message_ids = messages::mark_ticket_messages_read(&self.db, ticket.id).await?;
        tickets::reset_unread(&self.db, ticket.id, None).await?;

        if !message_ids.is_empty() {
            if let Some(to) = contact.identifier.clone() {
                let connection = deskwire_storage::queries::connections::get_connection(
                    &self.db,
                    ticket.connection_id,
                )
                .await?
                .ok_or(DeskwireError::NotFound {
                    entity: "connection",
                    id: ticket.connection_id.to_string(),
                })?;
                let command = Command::MarkAsRead(MarkAsRead {
                    session_id: ticket.connection_id,
                    to,
                    message_ids,
                });
                self.publisher
                    .publish(
                        command.to_envelope(tenant_id)?,
                        ticket.connection_id,
                        &connection.engine,
                    )
                    .await?;
            }
        }

        if let Some(updated) = tickets::get_ticket(&self.db, ticket.id).await? {
            self.emit_ticket(&updated, EntityAction::Update).await;
        }
        Ok(())
    }

    /// Open (or return) a conversation to an identifier, waiting on the
    /// enrichment barrier so the caller gets a presentable contact.
    pub async fn open_ticket(
        &self,
        tenant_id: i64,
        connection_id: i64,
        identifier: &str,
    ) -> Result<(Ticket, Contact), DeskwireError> {
        let connection = deskwire_storage::queries::connections::get_connection(
            &self.db,
            connection_id,
        )
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

        let contact = self
            .resolve_contact(
                tenant_id,
                &WireContact {
                    identifier: Some(identifier.to_string()),
                    lid: None,
                    name: None,
                    avatar_url: None,
                    is_group: false,
                    extra_info: vec![],
                },
            )
            .await?;

        // Targeted sync so enrichment has something to wait on.
        let command = Command::ContactSync(ContactSync {
            session_id: connection_id,
            identifier: Some(identifier.to_string()),
        });
        if let Err(e) = self
            .publisher
            .publish(command.to_envelope(tenant_id)?, connection_id, &connection.engine)
            .await
        {
            warn!(connection_id, error = %e, "contact sync publish failed");
        }
        let contact = self.await_enrichment(contact.id).await?;

        if let Some(active) =
            tickets::find_active_ticket(&self.db, tenant_id, contact.id, connection_id).await?
        {
            return Ok((active, contact));
        }
        let ticket = tickets::create_ticket(
            &self.db,
            tickets::NewTicket {
                tenant_id,
                contact_id: contact.id,
                connection_id,
                status: TicketStatus::Open,
                is_group: contact.is_group,
                unread_count: 0,
                last_message: String::new(),
            },
        )
        .await?;
        self.emit_ticket(&ticket, EntityAction::Create).await;
        Ok((ticket, contact))
    }
}
