// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket operations.
//!
//! The lifecycle rules (which status to reopen into, window lengths) live
//! in the ingest resolver; this module only exposes the lookups and
//! mutations it needs.

use rusqlite::{OptionalExtension, params};

use deskwire_core::DeskwireError;
use deskwire_core::types::TicketStatus;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::Ticket;

const COLUMNS: &str = "id, tenant_id, contact_id, connection_id, status, is_group, unread_count, \
                       last_message, owner_id, created_at, updated_at";

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    let status: String = row.get(4)?;
    Ok(Ticket {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        contact_id: row.get(2)?,
        connection_id: row.get(3)?,
        status: status.parse().map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("invalid ticket status `{status}`").into(),
            )
        })?,
        is_group: row.get(5)?,
        unread_count: row.get(6)?,
        last_message: row.get(7)?,
        owner_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Fields for a new ticket row.
#[derive(Debug, Clone)]
pub struct NewTicket {
    pub tenant_id: i64,
    pub contact_id: i64,
    pub connection_id: i64,
    pub status: TicketStatus,
    pub is_group: bool,
    pub unread_count: i64,
    pub last_message: String,
}

/// Insert a ticket and return the stored row.
pub async fn create_ticket(db: &Database, new: NewTicket) -> Result<Ticket, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO tickets
                     (tenant_id, contact_id, connection_id, status, is_group, unread_count,
                      last_message, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.tenant_id,
                    new.contact_id,
                    new.connection_id,
                    new.status.as_str(),
                    new.is_group,
                    new.unread_count,
                    new.last_message,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Ticket {
                id,
                tenant_id: new.tenant_id,
                contact_id: new.contact_id,
                connection_id: new.connection_id,
                status: new.status,
                is_group: new.is_group,
                unread_count: new.unread_count,
                last_message: new.last_message,
                owner_id: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a ticket by id.
pub async fn get_ticket(db: &Database, id: i64) -> Result<Option<Ticket>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let ticket = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM tickets WHERE id = ?1"),
                    params![id],
                    row_to_ticket,
                )
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// The ticket in `pending` or `open` state for (contact, connection,
/// tenant), if any. The schema-level invariant allows at most one.
pub async fn find_active_ticket(
    db: &Database,
    tenant_id: i64,
    contact_id: i64,
    connection_id: i64,
) -> Result<Option<Ticket>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let ticket = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM tickets
                         WHERE tenant_id = ?1 AND contact_id = ?2 AND connection_id = ?3
                           AND status IN ('pending', 'open')
                         ORDER BY updated_at DESC LIMIT 1"
                    ),
                    params![tenant_id, contact_id, connection_id],
                    row_to_ticket,
                )
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// The most-recently-updated ticket for (contact, connection), any status,
/// optionally restricted to rows updated at or after `updated_since`
/// (RFC 3339).
pub async fn find_latest_ticket(
    db: &Database,
    tenant_id: i64,
    contact_id: i64,
    connection_id: i64,
    updated_since: Option<String>,
) -> Result<Option<Ticket>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let ticket = match updated_since {
                Some(since) => conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM tickets
                             WHERE tenant_id = ?1 AND contact_id = ?2 AND connection_id = ?3
                               AND updated_at >= ?4
                             ORDER BY updated_at DESC LIMIT 1"
                        ),
                        params![tenant_id, contact_id, connection_id, since],
                        row_to_ticket,
                    )
                    .optional()?,
                None => conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM tickets
                             WHERE tenant_id = ?1 AND contact_id = ?2 AND connection_id = ?3
                             ORDER BY updated_at DESC LIMIT 1"
                        ),
                        params![tenant_id, contact_id, connection_id],
                        row_to_ticket,
                    )
                    .optional()?,
            };
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// Move a ticket into `status`, optionally clearing its owning agent.
pub async fn reopen_ticket(
    db: &Database,
    id: i64,
    status: TicketStatus,
    clear_owner: bool,
) -> Result<(), DeskwireError> {
    db.connection()
        .call(move |conn| {
            if clear_owner {
                conn.execute(
                    "UPDATE tickets SET status = ?1, owner_id = NULL, updated_at = ?2
                     WHERE id = ?3",
                    params![status.as_str(), now_rfc3339(), id],
                )?;
            } else {
                conn.execute(
                    "UPDATE tickets SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), now_rfc3339(), id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Add `delta` to the unread counter and refresh the preview.
pub async fn bump_unread(
    db: &Database,
    id: i64,
    delta: i64,
    last_message: &str,
) -> Result<(), DeskwireError> {
    let last_message = last_message.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tickets SET unread_count = unread_count + ?1, last_message = ?2,
                 updated_at = ?3 WHERE id = ?4",
                params![delta, last_message, now_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Reset the unread counter (outbound traffic and explicit reads).
pub async fn reset_unread(
    db: &Database,
    id: i64,
    last_message: Option<String>,
) -> Result<(), DeskwireError> {
    db.connection()
        .call(move |conn| {
            match last_message {
                Some(preview) => conn.execute(
                    "UPDATE tickets SET unread_count = 0, last_message = ?1, updated_at = ?2
                     WHERE id = ?3",
                    params![preview, now_rfc3339(), id],
                )?,
                None => conn.execute(
                    "UPDATE tickets SET unread_count = 0, updated_at = ?1 WHERE id = ?2",
                    params![now_rfc3339(), id],
                )?,
            };
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh the preview without touching the unread counter. Used by the
/// archival path so historical backfill does not disturb counters.
pub async fn touch_preview(db: &Database, id: i64, last_message: &str) -> Result<(), DeskwireError> {
    let last_message = last_message.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tickets SET last_message = ?1 WHERE id = ?2",
                params![last_message, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
