// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command publishing port.

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::DeskwireError;

/// Publishes command envelopes toward the engine owning a connection.
///
/// Routing needs more than the envelope carries: the connection id and the
/// engine token become part of the subject, so they travel alongside.
#[async_trait]
pub trait CommandPublisher: Send + Sync {
    async fn publish(
        &self,
        envelope: Envelope,
        connection_id: i64,
        engine: &str,
    ) -> Result<(), DeskwireError>;
}
