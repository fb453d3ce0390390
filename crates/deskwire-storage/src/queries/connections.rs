// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection operations.

use rusqlite::{OptionalExtension, params};

use deskwire_core::DeskwireError;
use deskwire_core::types::SessionStatus;

use crate::database::{Database, map_tr_err, now_rfc3339};
use crate::models::Connection;

const COLUMNS: &str =
    "id, tenant_id, name, engine, status, qrcode, pairing_code, created_at, updated_at";

fn row_to_connection(row: &rusqlite::Row<'_>) -> Result<Connection, rusqlite::Error> {
    Ok(Connection {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        name: row.get(2)?,
        engine: row.get(3)?,
        status: row.get(4)?,
        qrcode: row.get(5)?,
        pairing_code: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a connection with an explicit id.
pub async fn create_connection(
    db: &Database,
    id: i64,
    tenant_id: i64,
    name: &str,
    engine: &str,
) -> Result<Connection, DeskwireError> {
    let name = name.to_string();
    let engine = engine.to_string();
    db.connection()
        .call(move |conn| {
            let now = now_rfc3339();
            conn.execute(
                "INSERT INTO connections (id, tenant_id, name, engine, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, tenant_id, name, engine, now],
            )?;
            Ok(Connection {
                id,
                tenant_id,
                name,
                engine,
                status: "DISCONNECTED".to_string(),
                qrcode: None,
                pairing_code: None,
                created_at: now.clone(),
                updated_at: now,
            })
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a connection by id.
pub async fn get_connection(db: &Database, id: i64) -> Result<Option<Connection>, DeskwireError> {
    db.connection()
        .call(move |conn| {
            let connection = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM connections WHERE id = ?1"),
                    params![id],
                    row_to_connection,
                )
                .optional()?;
            Ok(connection)
        })
        .await
        .map_err(map_tr_err)
}

/// Overwrite the reported session status. Clears any stored QR code once
/// the session is connected.
pub async fn update_status(
    db: &Database,
    id: i64,
    status: SessionStatus,
) -> Result<(), DeskwireError> {
    let status = status.to_string();
    let clear_codes = status == "CONNECTED";
    db.connection()
        .call(move |conn| {
            if clear_codes {
                conn.execute(
                    "UPDATE connections SET status = ?1, qrcode = NULL, pairing_code = NULL,
                     updated_at = ?2 WHERE id = ?3",
                    params![status, now_rfc3339(), id],
                )?;
            } else {
                conn.execute(
                    "UPDATE connections SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status, now_rfc3339(), id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Store the latest QR code delivered for this connection.
pub async fn set_qrcode(db: &Database, id: i64, qrcode: &str) -> Result<(), DeskwireError> {
    let qrcode = qrcode.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE connections SET qrcode = ?1, updated_at = ?2 WHERE id = ?3",
                params![qrcode, now_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Store the latest pairing code delivered for this connection.
pub async fn set_pairing_code(db: &Database, id: i64, code: &str) -> Result<(), DeskwireError> {
    let code = code.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE connections SET pairing_code = ?1, updated_at = ?2 WHERE id = ?3",
                params![code, now_rfc3339(), id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tenants::create_tenant;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        create_tenant(&db, 1, "t", None).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn connection_lifecycle() {
        let (db, _dir) = setup().await;
        create_connection(&db, 7, 1, "support", "wa").await.unwrap();

        let c = get_connection(&db, 7).await.unwrap().unwrap();
        assert_eq!(c.status, "DISCONNECTED");
        assert_eq!(c.engine, "wa");

        set_qrcode(&db, 7, "qr-data").await.unwrap();
        update_status(&db, 7, SessionStatus::Qrcode).await.unwrap();
        let c = get_connection(&db, 7).await.unwrap().unwrap();
        assert_eq!(c.status, "QRCODE");
        assert_eq!(c.qrcode.as_deref(), Some("qr-data"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn connected_clears_codes() {
        let (db, _dir) = setup().await;
        create_connection(&db, 7, 1, "support", "wa").await.unwrap();
        set_qrcode(&db, 7, "qr-data").await.unwrap();
        set_pairing_code(&db, 7, "ABCD-1234").await.unwrap();

        update_status(&db, 7, SessionStatus::Connected).await.unwrap();
        let c = get_connection(&db, 7).await.unwrap().unwrap();
        assert_eq!(c.status, "CONNECTED");
        assert!(c.qrcode.is_none());
        assert!(c.pairing_code.is_none());

        db.close().await.unwrap();
    }
}
