//! Recording fakes for the sync engine's collaborators.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use tidemark_core::{CompletionNotifier, KeyValueStore, RefreshScheduler, Torrent};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One event captured by the [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierEvent {
    /// A torrent completed; carries the torrent id.
    Completed(i64),
    /// An add request hit a torrent the daemon already has.
    Duplicate(String),
    /// A user-facing error message.
    Error(String),
}

/// Notifier that records everything it is told.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifierEvent>>,
}

impl RecordingNotifier {
    /// All recorded events in arrival order.
    #[must_use]
    pub fn events(&self) -> Vec<NotifierEvent> {
        lock(&self.events).clone()
    }

    /// Ids of completion events, in arrival order.
    #[must_use]
    pub fn completed_ids(&self) -> Vec<i64> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                NotifierEvent::Completed(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl CompletionNotifier for RecordingNotifier {
    async fn torrent_completed(&self, torrent: &Torrent) {
        lock(&self.events).push(NotifierEvent::Completed(torrent.id));
    }

    async fn duplicate_torrent(&self, name: &str) {
        lock(&self.events).push(NotifierEvent::Duplicate(name.to_string()));
    }

    async fn error(&self, message: &str) {
        lock(&self.events).push(NotifierEvent::Error(message.to_string()));
    }
}

/// In-memory key-value store with the durable contract's semantics.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<HashMap<String, Value>>,
}

impl MemoryKv {
    /// Pre-seed a key, as if a previous process run had written it.
    pub fn seed(&self, key: &str, value: Value) {
        lock(&self.map).insert(key.to_string(), value);
    }

    /// Peek at a stored value.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<Value> {
        lock(&self.map).get(key).cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(lock(&self.map).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        lock(&self.map).insert(key.to_string(), value);
        Ok(())
    }
}

/// Scheduler fake that records schedules instead of arming timers. Tests
/// fire ticks by calling the daemon directly.
#[derive(Default)]
pub struct ManualScheduler {
    schedules: Mutex<HashMap<String, u64>>,
    cancellations: Mutex<Vec<String>>,
}

impl ManualScheduler {
    /// Period of a named schedule, when one is armed.
    #[must_use]
    pub fn period_minutes(&self, name: &str) -> Option<u64> {
        lock(&self.schedules).get(name).copied()
    }

    /// Names passed to `cancel`, in call order.
    #[must_use]
    pub fn cancellations(&self) -> Vec<String> {
        lock(&self.cancellations).clone()
    }
}

#[async_trait]
impl RefreshScheduler for ManualScheduler {
    async fn schedule(&self, name: &str, period_minutes: u64) -> anyhow::Result<()> {
        lock(&self.schedules).insert(name.to_string(), period_minutes);
        Ok(())
    }

    async fn cancel(&self, name: &str) -> anyhow::Result<()> {
        lock(&self.schedules).remove(name);
        lock(&self.cancellations).push(name.to_string());
        Ok(())
    }
}
