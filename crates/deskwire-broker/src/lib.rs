// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JetStream transport for Deskwire.
//!
//! Two streams per namespace: one for engine events, one for commands.
//! Event delivery is at-least-once with explicit acks; unprocessable
//! envelopes are terminally nacked rather than redelivered forever.

pub mod broker;
pub mod consumer;
pub mod subjects;

pub use broker::{Broker, NatsCommandPublisher};
pub use consumer::run_events_consumer;
