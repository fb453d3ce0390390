// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations.
//!
//! Message ids come from the wire (or from the optimistic client) and are
//! TEXT primary keys, so inserts surface duplicate deliveries as
//! constraint errors that callers probe for with [`message_exists`].

use rusqlite::{OptionalExtension, params};

use deskwire_core::DeskwireError;

use crate::database::{Database, map_tr_boxed_err, map_tr_err, now_rfc3339};
use crate::models::Message;

const COLUMNS: &str = "id, ticket_id, contact_id, tenant_id, body, media_url, media_type, \
                       from_me, ack, is_read, quoted_msg_id, raw_payload, reactions, is_deleted, \
                       created_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, rusqlite::Error> {
    Ok(Message {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        contact_id: row.get(2)?,
        tenant_id: row.get(3)?,
        body: row.get(4)?,
        media_url: row.get(5)?,
        media_type: row.get(6)?,
        from_me: row.get(7)?,
        ack: row.get(8)?,
        is_read: row.get(9)?,
        quoted_msg_id: row.get(10)?,
        raw_payload: row.get(11)?,
        reactions: row.get(12)?,
        is_deleted: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// Fields for a new message row.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub id: String,
    pub ticket_id: i64,
    pub contact_id: i64,
    pub tenant_id: i64,
    pub body: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    pub from_me: bool,
    pub ack: i64,
    pub is_read: bool,
    pub quoted_msg_id: Option<String>,
    pub raw_payload: Option<String>,
    /// Explicit RFC 3339 timestamp; the current instant when `None`.
    pub created_at: Option<String>,
}

/// Insert a message and return the stored row.
pub async fn insert_message(db: &Database, new: NewMessage) -> Result<Message, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let created_at = new.created_at.unwrap_or_else(now_rfc3339);
            conn.execute(
                "INSERT INTO messages
                     (id, ticket_id, contact_id, tenant_id, body, media_url, media_type,
                      from_me, ack, is_read, quoted_msg_id, raw_payload, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    new.id,
                    new.ticket_id,
                    new.contact_id,
                    new.tenant_id,
                    new.body,
                    new.media_url,
                    new.media_type,
                    new.from_me,
                    new.ack,
                    new.is_read,
                    new.quoted_msg_id,
                    new.raw_payload,
                    created_at,
                ],
            )?;
            Ok(Message {
                id: new.id,
                ticket_id: new.ticket_id,
                contact_id: new.contact_id,
                tenant_id: new.tenant_id,
                body: new.body,
                media_url: new.media_url,
                media_type: new.media_type,
                from_me: new.from_me,
                ack: new.ack,
                is_read: new.is_read,
                quoted_msg_id: new.quoted_msg_id,
                raw_payload: new.raw_payload,
                reactions: "[]".to_string(),
                is_deleted: false,
                created_at,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by wire id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"),
                    params![id],
                    row_to_message,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether a message with this id is stored. Used to validate quoted
/// references before insert.
pub async fn message_exists(db: &Database, id: &str) -> Result<bool, DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
        .await
        .map_err(map_tr_err)
}

/// Physically remove a message row (placeholder reconciliation).
pub async fn delete_message(db: &Database, id: &str) -> Result<(), DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Raise the delivery ack, never lowering it. Returns whether the update
/// found the row, regardless of whether the ack moved.
pub async fn update_ack_if_higher(
    db: &Database,
    id: &str,
    ack: i64,
) -> Result<bool, DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_some() {
                conn.execute(
                    "UPDATE messages SET ack = ?1 WHERE id = ?2 AND ack < ?1",
                    params![ack, id],
                )?;
            }
            Ok(found.is_some())
        })
        .await
        .map_err(map_tr_err)
}

/// Fill in media fields delivered after the original insert (redelivery
/// with a download URL the first event lacked).
pub async fn update_media(
    db: &Database,
    id: &str,
    media_url: &str,
    media_type: Option<&str>,
) -> Result<(), DeskwireError> {
    let id = id.to_string();
    let media_url = media_url.to_string();
    let media_type = media_type.map(String::from);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET media_url = ?1, media_type = COALESCE(?2, media_type)
                 WHERE id = ?3",
                params![media_url, media_type, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Append a reaction object to the stored reactions array.
pub async fn append_reaction(
    db: &Database,
    id: &str,
    reaction: serde_json::Value,
) -> Result<(), DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let current: Option<String> = conn
                .query_row(
                    "SELECT reactions FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(());
            };
            let mut reactions: Vec<serde_json::Value> =
                serde_json::from_str(&current).unwrap_or_default();
            reactions.push(reaction);
            let updated = serde_json::to_string(&reactions)
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
            conn.execute(
                "UPDATE messages SET reactions = ?1 WHERE id = ?2",
                params![updated, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_boxed_err)
}

/// Soft-delete a message revoked on the wire. The row stays so quoted
/// references keep resolving.
pub async fn mark_revoked(db: &Database, id: &str) -> Result<(), DeskwireError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET is_deleted = 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark every unread inbound message of a ticket as read and return their
/// ids, oldest first, for the read-receipt commands.
pub async fn mark_ticket_messages_read(
    db: &Database,
    ticket_id: i64,
) -> Result<Vec<String>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM messages
                 WHERE ticket_id = ?1 AND from_me = 0 AND is_read = 0
                 ORDER BY created_at ASC",
            )?;
            let ids = stmt
                .query_map(params![ticket_id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE ticket_id = ?1 AND from_me = 0 AND is_read = 0",
                params![ticket_id],
            )?;
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}
