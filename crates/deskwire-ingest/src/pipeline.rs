// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline and its injected dependencies.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use deskwire_config::DeskwireConfig;
use deskwire_core::traits::{CommandPublisher, Coordinator, RoomNotifier};
use deskwire_storage::Database;

/// Tuning knobs the pipeline reads, flattened out of the config tree.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Default reopen window for individual tickets; tenants may override.
    pub reopen_window_minutes: i64,
    /// Messages older than this are archived without reopening tickets.
    pub historical_cutoff_hours: i64,
    pub enrichment_poll: Duration,
    pub enrichment_timeout: Duration,
    pub ack_retry_attempts: u32,
    pub ack_retry_delay: Duration,
    pub start_lock_ttl: Duration,
    /// Directory cached avatars are written under.
    pub media_dir: PathBuf,
}

impl PipelineSettings {
    pub fn from_config(config: &DeskwireConfig) -> Self {
        Self {
            reopen_window_minutes: config.ingest.reopen_window_minutes,
            historical_cutoff_hours: config.ingest.historical_cutoff_hours,
            enrichment_poll: Duration::from_millis(config.ingest.enrichment_poll_ms),
            enrichment_timeout: Duration::from_millis(config.ingest.enrichment_timeout_ms),
            ack_retry_attempts: config.ingest.ack_retry_attempts,
            ack_retry_delay: Duration::from_millis(config.ingest.ack_retry_delay_ms),
            start_lock_ttl: Duration::from_secs(config.coordination.start_lock_ttl_secs),
            media_dir: PathBuf::from(&config.storage.media_dir),
        }
    }
}

/// The event-ingestion pipeline.
///
/// Holds the store plus the three outward ports. Everything that leaves the
/// process goes through a port, so tests run against recording doubles.
/// Handler methods live in the sibling modules, grouped by concern.
pub struct Pipeline {
    pub(crate) db: Database,
    pub(crate) notifier: Arc<dyn RoomNotifier>,
    pub(crate) publisher: Arc<dyn CommandPublisher>,
    pub(crate) coordinator: Arc<dyn Coordinator>,
    pub(crate) http: reqwest::Client,
    pub(crate) settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        db: Database,
        notifier: Arc<dyn RoomNotifier>,
        publisher: Arc<dyn CommandPublisher>,
        coordinator: Arc<dyn Coordinator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            db,
            notifier,
            publisher,
            coordinator,
            http: reqwest::Client::new(),
            settings,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}
