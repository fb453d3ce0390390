// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event ingestion for Deskwire.
//!
//! The [`Pipeline`] turns broker envelopes into durable conversation
//! records: contact identity resolution with collision merge, ticket
//! lifecycle with time-windowed reopening, idempotent message upserts
//! with optimistic-UI placeholder reconciliation, the enrichment barrier,
//! and the session-start guard. It also carries the producer side:
//! outbound sends, read marking, and proactive ticket opening.

pub mod contact;
pub mod dispatch;
pub mod enrichment;
pub mod message;
pub mod notify;
pub mod outbound;
pub mod pipeline;
pub mod session;
pub mod ticket;

#[cfg(test)]
mod testutil;

pub use enrichment::is_enriched;
pub use pipeline::{Pipeline, PipelineSettings};
pub use session::StartOptions;
