// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subject and stream naming.
//!
//! Events and commands get disjoint subject spaces under the configured
//! namespace so each direction can live in its own stream:
//!
//! ```text
//! {ns}.events.{tenant}.{connection}.{type}           engine -> core
//! {ns}.commands.{tenant}.{connection}.{engine}.{type}  core -> engine
//! ```
//!
//! The envelope `type` (e.g. `message.received`) contributes its own dotted
//! tokens, which is fine: consumers filter with `>` wildcards.

/// Subject an engine publishes an event envelope to.
pub fn event_subject(ns: &str, tenant_id: i64, connection_id: i64, event_type: &str) -> String {
    format!("{ns}.events.{tenant_id}.{connection_id}.{event_type}")
}

/// Subject the core publishes a command envelope to. The engine token lets
/// each engine type filter for its own connections.
pub fn command_subject(
    ns: &str,
    tenant_id: i64,
    connection_id: i64,
    engine: &str,
    command_type: &str,
) -> String {
    format!("{ns}.commands.{tenant_id}.{connection_id}.{engine}.{command_type}")
}

/// Wildcard matching every event subject in the namespace.
pub fn events_wildcard(ns: &str) -> String {
    format!("{ns}.events.>")
}

/// Wildcard matching every command subject in the namespace.
pub fn commands_wildcard(ns: &str) -> String {
    format!("{ns}.commands.>")
}

/// JetStream stream name for the event direction.
pub fn events_stream(ns: &str) -> String {
    format!("{}_EVENTS", ns.to_uppercase())
}

/// JetStream stream name for the command direction.
pub fn commands_stream(ns: &str) -> String {
    format!("{}_COMMANDS", ns.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_subjects_nest_under_namespace() {
        assert_eq!(
            event_subject("wire", 42, 7, "message.received"),
            "wire.events.42.7.message.received"
        );
        assert_eq!(events_wildcard("wire"), "wire.events.>");
    }

    #[test]
    fn command_subjects_carry_engine_token() {
        assert_eq!(
            command_subject("wire", 42, 7, "wa", "session.start"),
            "wire.commands.42.7.wa.session.start"
        );
        assert_eq!(commands_wildcard("wire"), "wire.commands.>");
    }

    #[test]
    fn stream_names_are_uppercased() {
        assert_eq!(events_stream("wire"), "WIRE_EVENTS");
        assert_eq!(commands_stream("wire"), "WIRE_COMMANDS");
    }

    #[test]
    fn directions_never_overlap() {
        let event = event_subject("wire", 1, 1, "session.status");
        assert!(event.starts_with("wire.events."));
        assert!(!event.starts_with("wire.commands."));
    }
}
