// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key layout for the coordination store.

/// Lock held while a session start is in flight for a connection.
pub fn start_lock(connection_id: i64) -> String {
    format!("session:start:{connection_id}")
}

/// Cached status snapshot for a connection.
pub fn status(connection_id: i64) -> String {
    format!("session:status:{connection_id}")
}
