// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `deskwire serve` command implementation.
//!
//! Wires the full service: SQLite storage, Redis coordination, the NATS
//! JetStream broker with its durable event consumer, the ingest pipeline,
//! and the HTTP/WebSocket gateway. Supports graceful shutdown via signal
//! handlers.

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};

use deskwire_broker::{Broker, NatsCommandPublisher, run_events_consumer};
use deskwire_config::DeskwireConfig;
use deskwire_coord::RedisCoordinator;
use deskwire_core::DeskwireError;
use deskwire_core::traits::EnvelopeHandler;
use deskwire_gateway::{AuthConfig, FanoutHub, GatewayState, ServerConfig, start_server};
use deskwire_ingest::{Pipeline, PipelineSettings};
use deskwire_storage::Database;

use crate::shutdown;

/// Runs the `deskwire serve` command.
pub async fn run_serve(config: DeskwireConfig) -> Result<(), DeskwireError> {
    init_tracing(&config.service.log_level);

    info!(service = config.service.name.as_str(), "starting deskwire serve");

    // Fail closed: an enabled gateway with no auth would expose every
    // tenant's tickets to the network.
    if config.gateway.enabled && config.gateway.bearer_token.is_none() {
        return Err(DeskwireError::Config(
            "gateway enabled but gateway.bearer_token is not set".to_string(),
        ));
    }

    // Install the Prometheus recorder before anything increments a counter.
    let prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>> =
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => Some(Arc::new(move || handle.render())),
            Err(e) => {
                warn!(error = %e, "prometheus recorder install failed, continuing without metrics");
                None
            }
        };

    // Storage (runs embedded migrations on open).
    let db = Database::open(&config.storage.database_path).await?;
    info!(path = config.storage.database_path.as_str(), "database ready");

    // Coordination store.
    let coordinator = RedisCoordinator::connect(&config.coordination.redis_url).await?;
    info!("coordination store connected");

    // Broker: retries until NATS is reachable, then declares the streams.
    let broker = Broker::connect(
        &config.broker.url,
        &config.broker.namespace,
        Duration::from_secs(config.broker.reconnect_delay_secs),
    )
    .await?;
    broker.ensure_streams().await?;

    let hub = Arc::new(FanoutHub::default());
    let publisher = Arc::new(NatsCommandPublisher::new(broker.clone()));

    let pipeline = Arc::new(Pipeline::new(
        db,
        hub.clone(),
        publisher,
        Arc::new(coordinator),
        PipelineSettings::from_config(&config),
    ));

    let cancel = shutdown::install_signal_handler();

    // Durable event consumer, one per process.
    let consumer_handle = {
        let broker = broker.clone();
        let handler = pipeline.clone() as Arc<dyn EnvelopeHandler>;
        let ack_wait = Duration::from_secs(config.broker.ack_wait_secs);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = run_events_consumer(&broker, handler, ack_wait, cancel.clone()).await {
                error!(error = %e, "event consumer failed");
                // Take the whole process down; a core without a consumer is dead weight.
                cancel.cancel();
            }
        })
    };

    if config.gateway.enabled {
        let server_config = ServerConfig {
            host: config.gateway.host.clone(),
            port: config.gateway.port,
        };
        let state = GatewayState {
            pipeline,
            hub,
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            prometheus_render,
            start_time: std::time::Instant::now(),
        };
        start_server(&server_config, state, cancel.clone()).await?;
    } else {
        info!("gateway disabled by configuration");
        cancel.cancelled().await;
    }

    if let Err(e) = consumer_handle.await {
        warn!(error = %e, "event consumer task join failed");
    }

    info!("deskwire serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("deskwire={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
