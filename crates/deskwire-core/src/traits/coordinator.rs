// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coordination-store port: TTL locks and the advisory status cache.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::DeskwireError;
use crate::types::SessionSnapshot;

/// Shared key-value coordination primitives.
///
/// The lock value is an opaque token whose only meaning is presence, so
/// release is an unconditional delete. The status cache is advisory; the
/// relational store stays authoritative.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Try to take the lock. Returns `false` when another holder exists.
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, DeskwireError>;

    /// Drop the lock if present.
    async fn release(&self, key: &str) -> Result<(), DeskwireError>;

    /// Overwrite the cached status snapshot for a connection.
    async fn put_status(
        &self,
        connection_id: i64,
        snapshot: &SessionSnapshot,
    ) -> Result<(), DeskwireError>;

    /// Read the cached status snapshot, if any.
    async fn get_status(
        &self,
        connection_id: i64,
    ) -> Result<Option<SessionSnapshot>, DeskwireError>;
}
