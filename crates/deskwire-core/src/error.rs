// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Deskwire backend.

use thiserror::Error;

/// The primary error type used across all Deskwire crates.
#[derive(Debug, Error)]
pub enum DeskwireError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Broker errors (connect, publish, consumer setup).
    #[error("broker error: {message}")]
    Broker {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Coordination store errors (lock and status-cache operations).
    #[error("coordination error: {message}")]
    Coordination {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A session start is already in progress for this connection.
    ///
    /// Surfaced to callers as a conflict; never retried automatically.
    #[error("session start already in progress for connection {connection_id}")]
    SessionBusy { connection_id: i64 },

    /// Envelope encode/decode errors.
    #[error("envelope error: {0}")]
    Envelope(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
