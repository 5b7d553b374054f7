//! Collaborator traits consumed by the sync engine.
//!
//! These are the seams where the external world plugs in: the mirrored
//! state store read by the presentation layer, the notifier surfacing
//! completion and error events, the durable key-value store surviving
//! process restarts, and the restart-durable wake-up scheduler.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{SessionSettings, SpeedSample, Torrent};

/// Mirrored entity store owned outside the sync core. The sync engine is its
/// only writer; presentation code only reads.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// All mirrored torrent ids.
    async fn torrent_ids(&self) -> anyhow::Result<Vec<i64>>;

    /// Ids whose completion predicate is still false.
    async fn active_torrent_ids(&self) -> anyhow::Result<Vec<i64>>;

    /// Look up one torrent by id.
    async fn torrent(&self, id: i64) -> anyhow::Result<Option<Torrent>>;

    /// Replace the whole entity set (full sync).
    async fn replace_torrents(&self, torrents: Vec<Torrent>) -> anyhow::Result<()>;

    /// Merge a subset of entities (incremental sync); ids absent from the
    /// subset are left untouched.
    async fn merge_torrents(&self, torrents: Vec<Torrent>) -> anyhow::Result<()>;

    /// Remove the given ids.
    async fn remove_torrents(&self, ids: &[i64]) -> anyhow::Result<()>;

    /// Current session-settings singleton.
    async fn settings(&self) -> anyhow::Result<SessionSettings>;

    /// Replace the session-settings singleton wholesale.
    async fn replace_settings(&self, settings: SessionSettings) -> anyhow::Result<()>;

    /// Append one speed sample, pruning samples older than the retention
    /// window.
    async fn push_speed_sample(&self, sample: SpeedSample) -> anyhow::Result<()>;

    /// All samples taken at or after the given instant, oldest first.
    async fn speed_samples_since(&self, since: DateTime<Utc>)
    -> anyhow::Result<Vec<SpeedSample>>;
}

/// Sink for user-facing events raised by the sync engine.
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// A torrent finished downloading since the last refresh.
    async fn torrent_completed(&self, torrent: &Torrent);

    /// An add request matched a torrent the daemon already has.
    async fn duplicate_torrent(&self, name: &str) {
        let _ = name;
    }

    /// An operation failed in a way the user should see.
    async fn error(&self, message: &str) {
        let _ = message;
    }
}

/// Small durable map surviving process restarts. Only scalar/array JSON
/// values are stored; an absent key is distinct from an empty value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch a value, `None` when the key was never written.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
}

/// Restart-durable recurring wake-up primitive. The schedule itself, not any
/// in-memory timer, is the source of truth for when the next tick fires.
#[async_trait]
pub trait RefreshScheduler: Send + Sync {
    /// Create or replace a named recurring schedule. Resolution is whole
    /// minutes; `period_minutes` is at least 1.
    async fn schedule(&self, name: &str, period_minutes: u64) -> anyhow::Result<()>;

    /// Cancel a named schedule. Cancelling an unknown name is a no-op.
    async fn cancel(&self, name: &str) -> anyhow::Result<()>;
}
