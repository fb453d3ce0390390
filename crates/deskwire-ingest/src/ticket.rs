// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lifecycle resolution.
//!
//! One ticket in `pending`/`open` per (contact, connection, tenant).
//! Individuals prefer reopening a recently closed ticket (dropping back
//! into the shared queue with the owner cleared) over opening a new one;
//! groups always continue their single long-lived thread as `open`.

use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use tracing::debug;

use deskwire_core::DeskwireError;
use deskwire_core::types::{EntityAction, TicketStatus};
use deskwire_storage::models::{Contact, Ticket};
use deskwire_storage::queries::{tenants, tickets};

use crate::pipeline::Pipeline;

impl Pipeline {
    /// Find or create the ticket an inbound message belongs to, applying
    /// the unread delta (`from_me` resets, inbound bumps).
    pub async fn resolve_ticket(
        &self,
        tenant_id: i64,
        contact: &Contact,
        connection_id: i64,
        from_me: bool,
        preview: &str,
    ) -> Result<Ticket, DeskwireError> {
        if let Some(ticket) =
            tickets::find_active_ticket(&self.db, tenant_id, contact.id, connection_id).await?
        {
            return self.touch_ticket(ticket.id, from_me, preview).await;
        }

        let reopened = if contact.is_group {
            // Groups: one thread forever; any prior ticket comes back open.
            match tickets::find_latest_ticket(&self.db, tenant_id, contact.id, connection_id, None)
                .await?
            {
                Some(previous) => {
                    tickets::reopen_ticket(&self.db, previous.id, TicketStatus::Open, false)
                        .await?;
                    Some(previous.id)
                }
                None => None,
            }
        } else {
            let cutoff = self.reopen_cutoff(tenant_id).await?;
            match tickets::find_latest_ticket(
                &self.db,
                tenant_id,
                contact.id,
                connection_id,
                Some(cutoff),
            )
            .await?
            {
                Some(previous) => {
                    // Back into the shared queue, unassigned.
                    tickets::reopen_ticket(&self.db, previous.id, TicketStatus::Pending, true)
                        .await?;
                    Some(previous.id)
                }
                None => None,
            }
        };

        if let Some(id) = reopened {
            debug!(tenant_id, ticket_id = id, "ticket reopened");
            return self.touch_ticket(id, from_me, preview).await;
        }

        let status = if contact.is_group {
            TicketStatus::Open
        } else {
            TicketStatus::Pending
        };
        let ticket = tickets::create_ticket(
            &self.db,
            tickets::NewTicket {
                tenant_id,
                contact_id: contact.id,
                connection_id,
                status,
                is_group: contact.is_group,
                unread_count: if from_me { 0 } else { 1 },
                last_message: preview.to_string(),
            },
        )
        .await?;
        debug!(tenant_id, ticket_id = ticket.id, status = %ticket.status, "ticket created");
        self.emit_ticket(&ticket, EntityAction::Create).await;
        Ok(ticket)
    }

    /// Apply the unread delta and preview to an existing ticket and emit
    /// the update.
    async fn touch_ticket(
        &self,
        ticket_id: i64,
        from_me: bool,
        preview: &str,
    ) -> Result<Ticket, DeskwireError> {
        if from_me {
            tickets::reset_unread(&self.db, ticket_id, Some(preview.to_string())).await?;
        } else {
            tickets::bump_unread(&self.db, ticket_id, 1, preview).await?;
        }
        let ticket = tickets::get_ticket(&self.db, ticket_id)
            .await?
            .ok_or(DeskwireError::NotFound {
                entity: "ticket",
                id: ticket_id.to_string(),
            })?;
        self.emit_ticket(&ticket, EntityAction::Update).await;
        Ok(ticket)
    }

    /// Oldest `updated_at` an individual ticket may have and still be
    /// reopened. Tenants can override the window length.
    async fn reopen_cutoff(&self, tenant_id: i64) -> Result<String, DeskwireError> {
        let window_minutes = tenants::get_tenant(&self.db, tenant_id)
            .await?
            .and_then(|t| t.reopen_window_minutes)
            .unwrap_or(self.settings.reopen_window_minutes);
        Ok((Utc::now() - ChronoDuration::minutes(window_minutes))
            .to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{CONNECTION, TENANT, testbed};
    use deskwire_storage::Database;
    use deskwire_storage::queries::contacts::{NewContact, insert_contact};

    async fn make_contact(db: &Database, is_group: bool) -> Contact {
        insert_contact(
            db,
            NewContact {
                tenant_id: TENANT,
                identifier: Some(if is_group {
                    "123@g.us".to_string()
                } else {
                    "5511999@c.us".to_string()
                }),
                name: "Ana".to_string(),
                is_group,
                ..NewContact::default()
            },
        )
        .await
        .unwrap()
    }

    async fn backdate_ticket(db: &Database, ticket_id: i64, rfc3339: &str) {
        let stamp = rfc3339.to_string();
        db.connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE tickets SET updated_at = ?1 WHERE id = ?2",
                    rusqlite::params![stamp, ticket_id],
                )?;
                Ok::<_, rusqlite::Error>(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn active_ticket_is_reused_and_bumped() {
        let bed = testbed().await;
        let contact = make_contact(bed.pipeline.db(), false).await;

        let first = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "hi")
            .await
            .unwrap();
        let second = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "again")
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.unread_count, 2);
        assert_eq!(second.last_message, "again");
    }

    #[tokio::test]
    async fn outbound_resets_unread() {
        let bed = testbed().await;
        let contact = make_contact(bed.pipeline.db(), false).await;

        bed.pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "hi")
            .await
            .unwrap();
        let ticket = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, true, "reply")
            .await
            .unwrap();
        assert_eq!(ticket.unread_count, 0);
    }

    #[tokio::test]
    async fn closed_individual_reopens_pending_within_window() {
        let bed = testbed().await;
        let contact = make_contact(bed.pipeline.db(), false).await;

        let ticket = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "hi")
            .await
            .unwrap();
        tickets::reopen_ticket(bed.pipeline.db(), ticket.id, TicketStatus::Closed, false)
            .await
            .unwrap();
        // Owner set while the ticket was worked; reopening must clear it.
        bed.pipeline
            .db()
            .connection()
            .call({
                let id = ticket.id;
                move |conn| {
                    conn.execute(
                        "UPDATE tickets SET owner_id = 9 WHERE id = ?1",
                        rusqlite::params![id],
                    )?;
                    Ok::<_, rusqlite::Error>(())
                }
            })
            .await
            .unwrap();

        let reopened = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "back")
            .await
            .unwrap();
        assert_eq!(reopened.id, ticket.id);
        assert_eq!(reopened.status, TicketStatus::Pending);
        assert!(reopened.owner_id.is_none());
    }

    #[tokio::test]
    async fn stale_individual_gets_a_fresh_ticket() {
        let bed = testbed().await;
        let contact = make_contact(bed.pipeline.db(), false).await;

        let ticket = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "hi")
            .await
            .unwrap();
        tickets::reopen_ticket(bed.pipeline.db(), ticket.id, TicketStatus::Closed, false)
            .await
            .unwrap();
        backdate_ticket(bed.pipeline.db(), ticket.id, "2020-01-01T00:00:00.000Z").await;

        let fresh = bed
            .pipeline
            .resolve_ticket(TENANT, &contact, CONNECTION, false, "long time")
            .await
            .unwrap();
        assert_ne!(fresh.id, ticket.id);
        assert_eq!(fresh.status, TicketStatus::Pending);
    }

    #[tokio::test]
    async fn group_reopens_open_regardless_of_age() {
        let bed = testbed().await;
        let group = make_contact(bed.pipeline.db(), true).await;

        let ticket = bed
            .pipeline
            .resolve_ticket(TENANT, &group, CONNECTION, false, "hi")
            .await
            .unwrap();
        assert_eq!(ticket.status, TicketStatus::Open);

        tickets::reopen_ticket(bed.pipeline.db(), ticket.id, TicketStatus::Closed, false)
            .await
            .unwrap();
        backdate_ticket(bed.pipeline.db(), ticket.id, "2020-01-01T00:00:00.000Z").await;

        let reopened = bed
            .pipeline
            .resolve_ticket(TENANT, &group, CONNECTION, false, "still here")
            .await
            .unwrap();
        assert_eq!(reopened.id, ticket.id);
        assert_eq!(reopened.status, TicketStatus::Open);
    }

    #[tokio::test]
    async fn at_most_one_active_ticket() {
        let bed = testbed().await;
        let contact = make_contact(bed.pipeline.db(), false).await;

        for _ in 0..5 {
            bed.pipeline
                .resolve_ticket(TENANT, &contact, CONNECTION, false, "m")
                .await
                .unwrap();
        }
        let active: i64 = bed
            .pipeline
            .db()
            .connection()
            .call({
                let contact_id = contact.id;
                move |conn| {
                    let n = conn.query_row(
                        "SELECT COUNT(*) FROM tickets
                         WHERE contact_id = ?1 AND status IN ('pending', 'open')",
                        rusqlite::params![contact_id],
                        |row| row.get(0),
                    )?;
                    Ok::<_, rusqlite::Error>(n)
                }
            })
            .await
            .unwrap();
        assert_eq!(active, 1);
    }
}
