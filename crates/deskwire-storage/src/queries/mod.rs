// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity.

pub mod connections;
pub mod contacts;
pub mod messages;
pub mod tenants;
pub mod tickets;
