// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant operations.

use rusqlite::{OptionalExtension, params};

use deskwire_core::DeskwireError;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::Tenant;

fn row_to_tenant(row: &rusqlite::Row<'_>) -> Result<Tenant, rusqlite::Error> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        reopen_window_minutes: row.get(2)?,
        created_at: row.get(3)?,
    })
}

/// Insert a tenant with an explicit id.
pub async fn create_tenant(
    db: &Database,
    id: i64,
    name: &str,
    reopen_window_minutes: Option<i64>,
) -> Result<Tenant, DeskwireError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO tenants (id, name, reopen_window_minutes, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, name, reopen_window_minutes, now],
            )?;
            Ok(Tenant {
                id,
                name,
                reopen_window_minutes,
                created_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a tenant by id.
pub async fn get_tenant(db: &Database, id: i64) -> Result<Option<Tenant>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let tenant = conn
                .query_row(
                    "SELECT id, name, reopen_window_minutes, created_at
                     FROM tenants WHERE id = ?1",
                    params![id],
                    row_to_tenant,
                )
                .optional()?;
            Ok(tenant)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_and_get_tenant() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        create_tenant(&db, 42, "acme", Some(30)).await.unwrap();
        let tenant = get_tenant(&db, 42).await.unwrap().unwrap();
        assert_eq!(tenant.name, "acme");
        assert_eq!(tenant.reopen_window_minutes, Some(30));

        assert!(get_tenant(&db, 99).await.unwrap().is_none());
        db.close().await.unwrap();
    }
}
