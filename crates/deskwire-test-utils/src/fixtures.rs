// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database fixtures.

use tempfile::TempDir;

use deskwire_storage::Database;
use deskwire_storage::queries::{connections, tenants};

/// A migrated SQLite database in a temp directory. Keep the returned
/// `TempDir` alive for the duration of the test.
pub async fn temp_db() -> (Database, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let db = Database::open(dir.path().join("deskwire.db").to_str().unwrap())
        .await
        .expect("open database");
    (db, dir)
}

/// Tenant 1 ("acme") with the default reopen window.
pub async fn seed_tenant(db: &Database) -> i64 {
    tenants::create_tenant(db, 1, "acme", None)
        .await
        .expect("seed tenant");
    1
}

/// Connection `id` for tenant 1 on the `wa` engine.
pub async fn seed_connection(db: &Database, id: i64) -> i64 {
    connections::create_connection(db, id, 1, "support", "wa")
        .await
        .expect("seed connection");
    id
}
