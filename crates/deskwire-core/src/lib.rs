// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Deskwire ticketing backend.
//!
//! Provides the envelope protocol, domain types, the workspace error enum,
//! and the port traits every resolver and handler depends on. Nothing in
//! this crate talks to a broker, a store, or the network.

pub mod envelope;
pub mod error;
pub mod rooms;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use envelope::{Command, DecodeError, Envelope, InboundEvent};
pub use error::DeskwireError;
pub use rooms::RoomEvent;
pub use traits::{CommandPublisher, Coordinator, EnvelopeHandler, RoomNotifier};
pub use types::{EntityAction, SessionSnapshot, SessionStatus, TicketStatus};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = DeskwireError::Config("bad".into());
        let _storage = DeskwireError::Storage {
            source: Box::new(std::io::Error::other("io")),
        };
        let _broker = DeskwireError::Broker {
            message: "publish failed".into(),
            source: None,
        };
        let _coord = DeskwireError::Coordination {
            message: "redis down".into(),
            source: Some(Box::new(std::io::Error::other("io"))),
        };
        let _busy = DeskwireError::SessionBusy { connection_id: 7 };
        let _envelope = DeskwireError::Envelope("truncated".into());
        let _not_found = DeskwireError::NotFound {
            entity: "ticket",
            id: "9".into(),
        };
        let _timeout = DeskwireError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        let _internal = DeskwireError::Internal("oops".into());
    }

    #[test]
    fn session_busy_message_names_connection() {
        let err = DeskwireError::SessionBusy { connection_id: 12 };
        assert!(err.to_string().contains("connection 12"));
    }
}
