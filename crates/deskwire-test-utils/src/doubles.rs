// SPDX-FileCopyrightText: 2026 Deskwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording and in-memory implementations of the port traits.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use deskwire_core::DeskwireError;
use deskwire_core::envelope::Envelope;
use deskwire_core::rooms::RoomEvent;
use deskwire_core::traits::{CommandPublisher, Coordinator, RoomNotifier};
use deskwire_core::types::SessionSnapshot;

/// Captures every room event for later assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RoomEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RoomEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Events whose fan-out `event` field matches.
    pub fn events_of(&self, event: &str) -> Vec<RoomEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RoomNotifier for RecordingNotifier {
    async fn emit(&self, event: RoomEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// One captured command publish.
#[derive(Debug, Clone)]
pub struct PublishedCommand {
    pub envelope: Envelope,
    pub connection_id: i64,
    pub engine: String,
}

/// Captures published commands; can be told to fail the next publish.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<PublishedCommand>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent publish return a broker error.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedCommand> {
        self.published.lock().unwrap().clone()
    }

    /// Published envelopes whose `type` matches.
    pub fn published_of(&self, command_type: &str) -> Vec<PublishedCommand> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.envelope.event_type == command_type)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommandPublisher for RecordingPublisher {
    async fn publish(
        &self,
        envelope: Envelope,
        connection_id: i64,
        engine: &str,
    ) -> Result<(), DeskwireError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeskwireError::Broker {
                message: "publish failed (test double)".to_string(),
                source: None,
            });
        }
        self.published.lock().unwrap().push(PublishedCommand {
            envelope,
            connection_id,
            engine: engine.to_string(),
        });
        Ok(())
    }
}

/// In-process [`Coordinator`] with real TTL expiry.
#[derive(Default)]
pub struct MemoryCoordinator {
    locks: Mutex<HashMap<String, Instant>>,
    statuses: Mutex<HashMap<i64, SessionSnapshot>>,
}

impl MemoryCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a live (unexpired) lock exists for the key.
    pub fn holds(&self, key: &str) -> bool {
        self.locks
            .lock()
            .unwrap()
            .get(key)
            .is_some_and(|deadline| *deadline > Instant::now())
    }
}

#[async_trait]
impl Coordinator for MemoryCoordinator {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<bool, DeskwireError> {
        let mut locks = self.locks.lock().unwrap();
        let now = Instant::now();
        match locks.get(key) {
            Some(deadline) if *deadline > now => Ok(false),
            _ => {
                locks.insert(key.to_string(), now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, key: &str) -> Result<(), DeskwireError> {
        self.locks.lock().unwrap().remove(key);
        Ok(())
    }

    async fn put_status(
        &self,
        connection_id: i64,
        snapshot: &SessionSnapshot,
    ) -> Result<(), DeskwireError> {
        self.statuses
            .lock()
            .unwrap()
            .insert(connection_id, snapshot.clone());
        Ok(())
    }

    async fn get_status(
        &self,
        connection_id: i64,
    ) -> Result<Option<SessionSnapshot>, DeskwireError> {
        Ok(self.statuses.lock().unwrap().get(&connection_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_lock_honors_ttl() {
        let coord = MemoryCoordinator::new();
        assert!(coord.acquire("k", Duration::from_secs(60)).await.unwrap());
        assert!(!coord.acquire("k", Duration::from_secs(60)).await.unwrap());

        coord.release("k").await.unwrap();
        assert!(coord.acquire("k", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lock_can_be_retaken() {
        let coord = MemoryCoordinator::new();
        assert!(coord.acquire("k", Duration::from_millis(5)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(coord.acquire("k", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn failing_publisher_records_nothing() {
        let publisher = RecordingPublisher::new();
        publisher.set_fail(true);
        let env = Envelope::new(1, "session.start", serde_json::json!({}));
        assert!(publisher.publish(env, 7, "wa").await.is_err());
        assert!(publisher.published().is_empty());
    }
}
