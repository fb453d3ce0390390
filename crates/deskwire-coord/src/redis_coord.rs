// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed [`Coordinator`].

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::debug;

use deskwire_core::DeskwireError;
use deskwire_core::traits::Coordinator;
use deskwire_core::types::SessionSnapshot;

use crate::keys;

fn coord_err(message: &str, e: redis::RedisError) -> DeskwireError {
    DeskwireError::Coordination {
        message: message.to_string(),
        source: Some(Box::new(e)),
    }
}

/// Coordinator over a Redis connection manager.
///
/// The manager reconnects on its own; every call here is a single round
/// trip with no local state beyond the handle.
#[derive(Clone)]
pub struct RedisCoordinator {
    conn: ConnectionManager,
}

impl RedisCoordinator {
    /// Connect to Redis and wrap the connection in a reconnecting manager.
    pub async fn connect(url: &str) -> Result<Self, DeskwireError> {
        let client = redis::Client::open(url).map_err(|e| coord_err("invalid redis url", e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| coord_err("redis connect failed", e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Coordinator for RedisCoordinator {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, DeskwireError> {
        let mut conn = self.conn.clone();
        // SET NX PX: the value is an opaque marker, presence is the lock.
        let set: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg("1")
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e| coord_err("lock acquire failed", e))?;
        let acquired = set.is_some();
        debug!(key, acquired, "lock acquire");
        Ok(acquired)
    }

    async fn release(&self, key: &str) -> Result<(), DeskwireError> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| coord_err("lock release failed", e))?;
        debug!(key, "lock released");
        Ok(())
    }

    async fn put_status(
        &self,
        connection_id: i64,
        snapshot: &SessionSnapshot,
    ) -> Result<(), DeskwireError> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| DeskwireError::Internal(format!("status snapshot encode: {e}")))?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(keys::status(connection_id))
            .arg(json)
            .query_async(&mut conn)
            .await
            .map_err(|e| coord_err("status cache write failed", e))?;
        Ok(())
    }

    async fn get_status(
        &self,
        connection_id: i64,
    ) -> Result<Option<SessionSnapshot>, DeskwireError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(keys::status(connection_id))
            .query_async(&mut conn)
            .await
            .map_err(|e| coord_err("status cache read failed", e))?;
        match raw {
            // A snapshot that no longer parses is treated as absent rather
            // than failing the caller.
            Some(json) => Ok(serde_json::from_str(&json).ok()),
            None => Ok(None),
        }
    }
}
