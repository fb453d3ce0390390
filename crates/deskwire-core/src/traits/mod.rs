// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Port traits for the dependencies injected into resolvers and handlers.
//!
//! The pipeline never reaches for ambient broker/socket state; everything
//! that leaves the process goes through one of these traits so tests can
//! substitute recording or in-memory doubles.

pub mod coordinator;
pub mod handler;
pub mod notifier;
pub mod publisher;

pub use coordinator::Coordinator;
pub use handler::EnvelopeHandler;
pub use notifier::RoomNotifier;
pub use publisher::CommandPublisher;
