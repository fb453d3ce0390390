// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The event consumer loop.
//!
//! One durable pull consumer drains the event stream and feeds envelopes to
//! the ingestion handler. Delivery policy per envelope:
//!
//! - handler `Ok`: ack.
//! - undecodable bytes or handler `Err`: terminal nack (`AckKind::Term`),
//!   so a poison envelope is never redelivered.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::{self, AckKind};
use futures::StreamExt;
use metrics::counter;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::Envelope;
use deskwire_core::traits::EnvelopeHandler;

use crate::broker::{Broker, broker_err};
use crate::subjects;

const CONSUMER_NAME: &str = "deskwire-core";

/// What the loop does with a delivered message.
#[derive(Debug, PartialEq, Eq)]
enum Disposition {
    Ack,
    Term,
}

async fn dispose(handler: &dyn EnvelopeHandler, payload: &[u8]) -> Disposition {
    let envelope = match Envelope::from_bytes(payload) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "dropping undecodable envelope");
            counter!("deskwire_envelopes_dropped_total", "reason" => "decode").increment(1);
            return Disposition::Term;
        }
    };
    let envelope_id = envelope.id.clone();
    let event_type = envelope.event_type.clone();
    match handler.handle(envelope).await {
        Ok(()) => Disposition::Ack,
        Err(e) => {
            warn!(envelope_id, event_type, error = %e, "dropping unprocessable envelope");
            counter!("deskwire_envelopes_dropped_total", "reason" => "handler").increment(1);
            Disposition::Term
        }
    }
}

/// Run the event consumer until the token is cancelled.
pub async fn run_events_consumer(
    broker: &Broker,
    handler: Arc<dyn EnvelopeHandler>,
    ack_wait: Duration,
    cancel: CancellationToken,
) -> Result<(), DeskwireError> {
    let ns = broker.namespace();
    let stream_name = subjects::events_stream(ns);
    let consumer: jetstream::consumer::PullConsumer = broker
        .jetstream()
        .create_consumer_on_stream(
            jetstream::consumer::pull::Config {
                durable_name: Some(CONSUMER_NAME.to_string()),
                description: Some("Core ingestion consumer".to_string()),
                filter_subject: subjects::events_wildcard(ns),
                ack_wait,
                ..Default::default()
            },
            stream_name.clone(),
        )
        .await
        .map_err(|e| broker_err(format!("failed to create consumer on {stream_name}"), e))?;

    let mut messages = consumer
        .messages()
        .await
        .map_err(|e| broker_err("failed to open consumer message stream", e))?;

    info!(stream = %stream_name, consumer = CONSUMER_NAME, "event consumer running");
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => {
                info!("event consumer stopping");
                return Ok(());
            }
            message = messages.next() => message,
        };
        let Some(message) = message else {
            return Err(DeskwireError::Broker {
                message: "consumer message stream ended".to_string(),
                source: None,
            });
        };
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "consumer pull error");
                continue;
            }
        };

        match dispose(handler.as_ref(), &message.payload).await {
            Disposition::Ack => {
                if let Err(e) = message.ack().await {
                    warn!(error = %e, "ack failed; envelope will be redelivered");
                }
            }
            Disposition::Term => {
                if let Err(e) = message.ack_with(AckKind::Term).await {
                    warn!(error = %e, "terminal nack failed");
                }
            }
        }
        debug!(subject = %message.subject, "envelope processed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHandler {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnvelopeHandler for StubHandler {
        async fn handle(&self, _envelope: Envelope) -> Result<(), DeskwireError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DeskwireError::Internal("boom".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn valid_envelope_is_acked() {
        let handler = StubHandler {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        let envelope = Envelope::new(1, "session.status", json!({"sessionId": 1}));
        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(dispose(&handler, &bytes).await, Disposition::Ack);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failure_is_terminal() {
        let handler = StubHandler {
            fail: true,
            calls: AtomicUsize::new(0),
        };
        let envelope = Envelope::new(1, "session.status", json!({"sessionId": 1}));
        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(dispose(&handler, &bytes).await, Disposition::Term);
    }

    #[tokio::test]
    async fn garbage_bytes_are_terminal_without_reaching_handler() {
        let handler = StubHandler {
            fail: false,
            calls: AtomicUsize::new(0),
        };
        assert_eq!(dispose(&handler, b"not json").await, Disposition::Term);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }
}
