// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test scaffolding for the handler modules.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use deskwire_test_utils::{
    MemoryCoordinator, RecordingNotifier, RecordingPublisher, seed_connection, seed_tenant, temp_db,
};

use crate::pipeline::{Pipeline, PipelineSettings};

pub(crate) const TENANT: i64 = 1;
pub(crate) const CONNECTION: i64 = 3;

pub(crate) struct TestBed {
    pub pipeline: Pipeline,
    pub notifier: Arc<RecordingNotifier>,
    pub publisher: Arc<RecordingPublisher>,
    pub coordinator: Arc<MemoryCoordinator>,
    _dir: TempDir,
}

fn fast_settings(media_dir: std::path::PathBuf) -> PipelineSettings {
    PipelineSettings {
        reopen_window_minutes: 120,
        historical_cutoff_hours: 24,
        enrichment_poll: Duration::from_millis(10),
        enrichment_timeout: Duration::from_millis(200),
        ack_retry_attempts: 3,
        ack_retry_delay: Duration::from_millis(5),
        start_lock_ttl: Duration::from_secs(60),
        media_dir,
    }
}

/// A pipeline over a migrated temp database with tenant 1 and connection 3
/// seeded, wired to recording doubles.
pub(crate) async fn testbed() -> TestBed {
    let (db, dir) = temp_db().await;
    seed_tenant(&db).await;
    seed_connection(&db, CONNECTION).await;

    let notifier = Arc::new(RecordingNotifier::new());
    let publisher = Arc::new(RecordingPublisher::new());
    let coordinator = Arc::new(MemoryCoordinator::new());
    let pipeline = Pipeline::new(
        db,
        notifier.clone(),
        publisher.clone(),
        coordinator.clone(),
        fast_settings(dir.path().join("media")),
    );
    TestBed {
        pipeline,
        notifier,
        publisher,
        coordinator,
        _dir: dir,
    }
}
