// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Envelope handling port.

use async_trait::async_trait;

use crate::envelope::Envelope;
use crate::error::DeskwireError;

/// Processes one envelope delivered by the broker gateway.
///
/// Returning `Err` means the envelope is unprocessable: the consumer
/// terminally nacks it and moves on. An unknown envelope `type` is NOT an
/// error; implementations log and return `Ok(())` so the message is acked
/// and dropped.
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> Result<(), DeskwireError>;
}
