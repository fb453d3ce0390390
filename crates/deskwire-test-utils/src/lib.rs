// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Deskwire.
//!
//! Provides recording/in-memory implementations of the port traits and
//! database fixtures for fast, deterministic tests without NATS or Redis.

pub mod doubles;
pub mod fixtures;

pub use doubles::{MemoryCoordinator, PublishedCommand, RecordingNotifier, RecordingPublisher};
pub use fixtures::{seed_connection, seed_tenant, temp_db};
