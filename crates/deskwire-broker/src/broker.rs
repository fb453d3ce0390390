// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broker connection, stream bootstrap, and the command publisher.

use std::time::Duration;

use async_nats::jetstream::{self, stream::Config as StreamConfig};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use deskwire_core::DeskwireError;
use deskwire_core::envelope::Envelope;
use deskwire_core::traits::CommandPublisher;

use crate::subjects;

pub(crate) fn broker_err(
    message: impl Into<String>,
    source: impl std::error::Error + Send + Sync + 'static,
) -> DeskwireError {
    DeskwireError::Broker {
        message: message.into(),
        source: Some(Box::new(source)),
    }
}

/// Handle to the JetStream broker.
#[derive(Clone)]
pub struct Broker {
    jetstream: jetstream::Context,
    namespace: String,
}

impl Broker {
    /// Connect to NATS, retrying at a fixed delay until the server is
    /// reachable. Engines and the core come up in arbitrary order, so
    /// startup waits instead of failing.
    pub async fn connect(
        url: &str,
        namespace: &str,
        reconnect_delay: Duration,
    ) -> Result<Self, DeskwireError> {
        let client = loop {
            match async_nats::connect(url).await {
                Ok(client) => break client,
                Err(e) => {
                    warn!(url, error = %e, delay = ?reconnect_delay, "broker unreachable, retrying");
                    tokio::time::sleep(reconnect_delay).await;
                }
            }
        };
        info!(url, namespace, "connected to broker");
        Ok(Self {
            jetstream: jetstream::new(client),
            namespace: namespace.to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Ensure both direction streams exist.
    ///
    /// Events are work-queue retained: exactly one core consumes them and
    /// a processed envelope has no further readers. Commands use interest
    /// retention so an engine that is briefly down still receives what was
    /// published for it.
    pub async fn ensure_streams(&self) -> Result<(), DeskwireError> {
        let ns = &self.namespace;
        self.get_or_create_stream(StreamConfig {
            name: subjects::events_stream(ns),
            description: Some("Engine events awaiting ingestion".to_string()),
            subjects: vec![subjects::events_wildcard(ns)],
            retention: jetstream::stream::RetentionPolicy::WorkQueue,
            max_age: Duration::from_secs(24 * 60 * 60),
            storage: jetstream::stream::StorageType::File,
            num_replicas: 1,
            discard: jetstream::stream::DiscardPolicy::Old,
            duplicate_window: Duration::from_secs(2 * 60),
            ..Default::default()
        })
        .await?;

        self.get_or_create_stream(StreamConfig {
            name: subjects::commands_stream(ns),
            description: Some("Commands routed to engines".to_string()),
            subjects: vec![subjects::commands_wildcard(ns)],
            retention: jetstream::stream::RetentionPolicy::Interest,
            max_age: Duration::from_secs(60 * 60),
            storage: jetstream::stream::StorageType::File,
            num_replicas: 1,
            discard: jetstream::stream::DiscardPolicy::Old,
            duplicate_window: Duration::from_secs(2 * 60),
            ..Default::default()
        })
        .await?;

        Ok(())
    }

    async fn get_or_create_stream(&self, config: StreamConfig) -> Result<(), DeskwireError> {
        let name = config.name.clone();
        match self.jetstream.get_stream(&name).await {
            Ok(_) => {
                debug!(stream = %name, "stream exists");
                Ok(())
            }
            Err(_) => {
                info!(stream = %name, "creating stream");
                self.jetstream
                    .create_stream(config)
                    .await
                    .map_err(|e| broker_err(format!("failed to create stream {name}"), e))?;
                Ok(())
            }
        }
    }

    /// Publish an envelope and wait for the stream's storage ack.
    pub async fn publish(&self, subject: String, envelope: &Envelope) -> Result<(), DeskwireError> {
        let bytes = envelope.to_bytes()?;
        let ack = self
            .jetstream
            .publish(subject.clone(), bytes.into())
            .await
            .map_err(|e| broker_err(format!("publish to {subject} failed"), e))?;
        ack.await
            .map_err(|e| broker_err(format!("publish to {subject} not acked"), e))?;
        Ok(())
    }
}

/// [`CommandPublisher`] over the JetStream command stream.
#[derive(Clone)]
pub struct NatsCommandPublisher {
    broker: Broker,
}

impl NatsCommandPublisher {
    pub fn new(broker: Broker) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl CommandPublisher for NatsCommandPublisher {
    async fn publish(
        &self,
        envelope: Envelope,
        connection_id: i64,
        engine: &str,
    ) -> Result<(), DeskwireError> {
        let subject = subjects::command_subject(
            self.broker.namespace(),
            envelope.tenant_id,
            connection_id,
            engine,
            &envelope.event_type,
        );
        debug!(subject, envelope_id = %envelope.id, "publishing command");
        self.broker.publish(subject, &envelope).await
    }
}
