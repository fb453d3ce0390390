// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Real-time fan-out port.

use async_trait::async_trait;

use crate::rooms::RoomEvent;

/// Emits room-scoped notifications to connected UI clients.
///
/// Fan-out is best effort: implementations log delivery problems instead of
/// returning them, so a slow or absent UI can never fail ingestion.
#[async_trait]
pub trait RoomNotifier: Send + Sync {
    async fn emit(&self, event: RoomEvent);
}
