// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/WebSocket edge for Deskwire.
//!
//! A thin authenticated surface over the ingest pipeline: session start/stop
//! with the 409-on-contention contract, proactive ticket opening, outbound
//! sends, read marking, and a room-subscribe WebSocket carrying the fan-out
//! stream. `/health` and `/metrics` stay unauthenticated for supervision.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod server;
pub mod ws;

pub use auth::AuthConfig;
pub use hub::FanoutHub;
pub use server::{GatewayState, ServerConfig, start_server};
