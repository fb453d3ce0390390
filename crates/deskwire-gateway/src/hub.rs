// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process fan-out hub bridging the ingest pipeline to WebSocket clients.
//!
//! The pipeline emits [`RoomEvent`]s through the [`RoomNotifier`] port; the
//! hub rebroadcasts them to every connected socket, which filters by its own
//! room subscription. Delivery is best effort: a hub with no listeners simply
//! drops events.

use async_trait::async_trait;
use tokio::sync::broadcast;

use deskwire_core::rooms::RoomEvent;
use deskwire_core::traits::RoomNotifier;

/// Buffered broadcast channel of room events.
///
/// Slow sockets that fall behind the buffer miss events rather than
/// backpressuring ingestion.
pub struct FanoutHub {
    tx: broadcast::Sender<RoomEvent>,
}

impl FanoutHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.tx.subscribe()
    }

    /// Number of currently attached sockets.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl RoomNotifier for FanoutHub {
    async fn emit(&self, event: RoomEvent) {
        // Err means no subscribers, which is fine.
        let _ = self.tx.send(event);
    }
}
