// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed coordination for Deskwire.
//!
//! Provides the session-start lock and the advisory status cache behind
//! the [`Coordinator`](deskwire_core::traits::Coordinator) port. The lock
//! carries a TTL so a crashed holder cannot wedge a connection forever.

pub mod keys;
mod redis_coord;

pub use redis_coord::RedisCoordinator;
