// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations, including the transactional collision merge.

use rusqlite::{OptionalExtension, params};

use deskwire_core::DeskwireError;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::Contact;

const COLUMNS: &str = "id, tenant_id, identifier, lid, name, avatar_url, is_group, extra_info, \
                       owner_id, created_at, updated_at";

fn row_to_contact(row: &rusqlite::Row<'_>) -> Result<Contact, rusqlite::Error> {
    Ok(Contact {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        identifier: row.get(2)?,
        lid: row.get(3)?,
        name: row.get(4)?,
        avatar_url: row.get(5)?,
        is_group: row.get(6)?,
        extra_info: row.get(7)?,
        owner_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Fields for a new contact row.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub tenant_id: i64,
    pub identifier: Option<String>,
    pub lid: Option<String>,
    pub name: String,
    pub avatar_url: Option<String>,
    pub is_group: bool,
    /// JSON array of `{name, value}` pairs.
    pub extra_info: String,
}

/// Insert a contact and return the stored row.
pub async fn insert_contact(db: &Database, new: NewContact) -> Result<Contact, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let now = now_rfc3339();
            let extra = if new.extra_info.is_empty() {
                "[]".to_string()
            } else {
                new.extra_info
            };
            conn.execute(
                "INSERT INTO contacts
                     (tenant_id, identifier, lid, name, avatar_url, is_group, extra_info,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    new.tenant_id,
                    new.identifier,
                    new.lid,
                    new.name,
                    new.avatar_url,
                    new.is_group,
                    extra,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            Ok(Contact {
                id,
                tenant_id: new.tenant_id,
                identifier: new.identifier,
                lid: new.lid,
                name: new.name,
                avatar_url: new.avatar_url,
                is_group: new.is_group,
                extra_info: extra,
                owner_id: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a contact by id.
pub async fn get_contact(db: &Database, id: i64) -> Result<Option<Contact>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM contacts WHERE id = ?1"),
                    params![id],
                    row_to_contact,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a contact by its phone-derived identifier within a tenant.
pub async fn find_by_identifier(
    db: &Database,
    tenant_id: i64,
    identifier: &str,
) -> Result<Option<Contact>, DeskwireError> {
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM contacts WHERE tenant_id = ?1 AND identifier = ?2"
                    ),
                    params![tenant_id, identifier],
                    row_to_contact,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a contact by its LID within a tenant.
pub async fn find_by_lid(
    db: &Database,
    tenant_id: i64,
    lid: &str,
) -> Result<Option<Contact>, DeskwireError> {
    let lid = lid.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM contacts WHERE tenant_id = ?1 AND lid = ?2"),
                    params![tenant_id, lid],
                    row_to_contact,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Persist the mutable fields of a contact.
pub async fn update_contact(db: &Database, contact: &Contact) -> Result<(), DeskwireError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts
                 SET identifier = ?1, lid = ?2, name = ?3, avatar_url = ?4, extra_info = ?5,
                     owner_id = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    contact.identifier,
                    contact.lid,
                    contact.name,
                    contact.avatar_url,
                    contact.extra_info,
                    contact.owner_id,
                    now_rfc3339(),
                    contact.id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Merge `loser_id` into `target_id` in one transaction: reassign the
/// loser's tickets and messages to the target, then delete the loser.
///
/// Field copying (LID, name, avatar) is the resolver's job and happens on
/// the target row before this call.
pub async fn merge_contacts(
    db: &Database,
    target_id: i64,
    loser_id: i64,
) -> Result<(), DeskwireError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "UPDATE tickets SET contact_id = ?1 WHERE contact_id = ?2",
                params![target_id, loser_id],
            )?;
            tx.execute(
                "UPDATE messages SET contact_id = ?1 WHERE contact_id = ?2",
                params![target_id, loser_id],
            )?;
            tx.execute("DELETE FROM contacts WHERE id = ?1", params![loser_id])?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::connections::create_connection;
    use crate::queries::tenants::create_tenant;
    use crate::queries::tickets::{NewTicket, create_ticket};
    use deskwire_core::types::TicketStatus;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        create_tenant(&db, 1, "t", None).await.unwrap();
        create_connection(&db, 3, 1, "support", "wa").await.unwrap();
        (db, dir)
    }

    fn new_contact(identifier: Option<&str>, lid: Option<&str>, name: &str) -> NewContact {
        NewContact {
            tenant_id: 1,
            identifier: identifier.map(String::from),
            lid: lid.map(String::from),
            name: name.to_string(),
            ..NewContact::default()
        }
    }

    #[tokio::test]
    async fn lookups_by_identifier_and_lid() {
        let (db, _dir) = setup().await;
        let c = insert_contact(&db, new_contact(Some("5511999@c.us"), Some("lid-1"), "Ana"))
            .await
            .unwrap();

        let by_ident = find_by_identifier(&db, 1, "5511999@c.us").await.unwrap();
        assert_eq!(by_ident.as_ref().map(|c| c.id), Some(c.id));

        let by_lid = find_by_lid(&db, 1, "lid-1").await.unwrap();
        assert_eq!(by_lid.map(|c| c.id), Some(c.id));

        assert!(find_by_identifier(&db, 2, "5511999@c.us")
            .await
            .unwrap()
            .is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_identifier_in_tenant_rejected() {
        let (db, _dir) = setup().await;
        insert_contact(&db, new_contact(Some("5511999@c.us"), None, "Ana"))
            .await
            .unwrap();
        let dup = insert_contact(&db, new_contact(Some("5511999@c.us"), None, "Ana2")).await;
        assert!(dup.is_err());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn null_identifiers_do_not_collide() {
        let (db, _dir) = setup().await;
        insert_contact(&db, new_contact(None, Some("lid-1"), "A"))
            .await
            .unwrap();
        // A second NULL identifier must be allowed.
        insert_contact(&db, new_contact(None, Some("lid-2"), "B"))
            .await
            .unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn merge_reassigns_tickets_and_deletes_loser() {
        let (db, _dir) = setup().await;
        let target = insert_contact(&db, new_contact(Some("5511999@c.us"), None, "Ana"))
            .await
            .unwrap();
        let loser = insert_contact(&db, new_contact(None, Some("lid-1"), "Ana"))
            .await
            .unwrap();

        let ticket = create_ticket(
            &db,
            NewTicket {
                tenant_id: 1,
                contact_id: loser.id,
                connection_id: 3,
                status: TicketStatus::Pending,
                is_group: false,
                unread_count: 1,
                last_message: "hi".to_string(),
            },
        )
        .await
        .unwrap();

        merge_contacts(&db, target.id, loser.id).await.unwrap();

        assert!(get_contact(&db, loser.id).await.unwrap().is_none());
        let reassigned = crate::queries::tickets::get_ticket(&db, ticket.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reassigned.contact_id, target.id);
        db.close().await.unwrap();
    }
}
