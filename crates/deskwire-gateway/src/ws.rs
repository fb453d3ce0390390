// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room-subscribe WebSocket delivering the fan-out stream.
//!
//! Client -> Server (JSON):
//! ```json
//! {"rooms": ["42-open", "42-notification"]}
//! ```
//!
//! Server -> Client: each matching [`RoomEvent`] serialized as JSON. A socket
//! receives an event when its subscription intersects the event's rooms;
//! until the first subscribe message it receives nothing.

use std::collections::HashSet;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use deskwire_core::rooms::RoomEvent;

use crate::server::GatewayState;

/// Subscription message from the client. Replaces the previous subscription.
#[derive(Debug, Deserialize)]
struct WsSubscribe {
    rooms: Vec<String>,
}

/// Query parameters for the WebSocket handshake.
///
/// Browsers cannot set headers on WebSocket upgrades, so the bearer token
/// travels as a query parameter instead.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    token: Option<String>,
}

/// WebSocket upgrade handler. Auth happens here, not in middleware.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<GatewayState>,
) -> Response {
    if !state.auth.token_matches(params.token.as_deref()) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

fn is_subscribed(rooms: &HashSet<String>, event: &RoomEvent) -> bool {
    event.rooms.iter().any(|room| rooms.contains(room))
}

/// Pump one socket: fan-out events out, subscription updates in.
async fn handle_socket(socket: WebSocket, state: GatewayState) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.hub.subscribe();
    let mut rooms: HashSet<String> = HashSet::new();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if !is_subscribed(&rooms, &event) {
                        continue;
                    }
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(error = %e, "room event failed to encode");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "slow websocket client missed events");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<WsSubscribe>(&text) {
                        Ok(subscribe) => {
                            rooms = subscribe.rooms.into_iter().collect();
                        }
                        Err(e) => tracing::warn!(error = %e, "invalid subscribe message"),
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {} // binary/ping handled below the app layer
                Some(Err(_)) => break,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskwire_core::rooms::{fanout, notification_room, ticket_room};
    use deskwire_core::types::EntityAction;
    use serde_json::json;

    #[test]
    fn subscribe_message_parses() {
        let msg: WsSubscribe =
            serde_json::from_str(r#"{"rooms": ["42-open", "42-notification"]}"#).unwrap();
        assert_eq!(msg.rooms.len(), 2);
    }

    #[test]
    fn subscription_filter_intersects_rooms() {
        let rooms: HashSet<String> = [notification_room(42)].into_iter().collect();
        let hit = RoomEvent::new(
            42,
            vec![ticket_room(42, 319), notification_room(42)],
            fanout::MESSAGE,
            EntityAction::Create,
            json!({}),
        );
        let miss = RoomEvent::new(
            42,
            vec![ticket_room(42, 319)],
            fanout::MESSAGE,
            EntityAction::Create,
            json!({}),
        );
        assert!(is_subscribed(&rooms, &hit));
        assert!(!is_subscribed(&rooms, &miss));
    }

    #[test]
    fn empty_subscription_receives_nothing() {
        let rooms = HashSet::new();
        let event = RoomEvent::new(
            1,
            vec![notification_room(1)],
            fanout::TICKET,
            EntityAction::Update,
            json!({}),
        );
        assert!(!is_subscribed(&rooms, &event));
    }
}
