//! In-memory mirrored state store.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tidemark_core::{SessionSettings, SpeedSample, StateStore, Torrent};

/// Retention window for the speed-history roll, in seconds.
pub const SPEED_RETENTION_SECS: i64 = 300;

#[derive(Default)]
struct Inner {
    torrents: BTreeMap<i64, Torrent>,
    settings: SessionSettings,
    samples: VecDeque<SpeedSample>,
}

/// Mirrored store holding normalized entities for one daemon endpoint. The
/// sync engine is the only writer; readers get cloned snapshots.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
}

impl MemoryStateStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cloned snapshot of every mirrored torrent, id order.
    #[must_use]
    pub fn torrents(&self) -> Vec<Torrent> {
        self.lock().torrents.values().cloned().collect()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn torrent_ids(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self.lock().torrents.keys().copied().collect())
    }

    async fn active_torrent_ids(&self) -> anyhow::Result<Vec<i64>> {
        Ok(self
            .lock()
            .torrents
            .values()
            .filter(|torrent| !torrent.is_complete())
            .map(|torrent| torrent.id)
            .collect())
    }

    async fn torrent(&self, id: i64) -> anyhow::Result<Option<Torrent>> {
        Ok(self.lock().torrents.get(&id).cloned())
    }

    async fn replace_torrents(&self, torrents: Vec<Torrent>) -> anyhow::Result<()> {
        let mut inner = self.lock();
        inner.torrents = torrents
            .into_iter()
            .map(|torrent| (torrent.id, torrent))
            .collect();
        Ok(())
    }

    async fn merge_torrents(&self, torrents: Vec<Torrent>) -> anyhow::Result<()> {
        let mut inner = self.lock();
        for torrent in torrents {
            inner.torrents.insert(torrent.id, torrent);
        }
        Ok(())
    }

    async fn remove_torrents(&self, ids: &[i64]) -> anyhow::Result<()> {
        let mut inner = self.lock();
        for id in ids {
            inner.torrents.remove(id);
        }
        Ok(())
    }

    async fn settings(&self) -> anyhow::Result<SessionSettings> {
        Ok(self.lock().settings.clone())
    }

    async fn replace_settings(&self, settings: SessionSettings) -> anyhow::Result<()> {
        self.lock().settings = settings;
        Ok(())
    }

    async fn push_speed_sample(&self, sample: SpeedSample) -> anyhow::Result<()> {
        let mut inner = self.lock();
        let horizon = sample.time - Duration::seconds(SPEED_RETENTION_SECS);
        inner.samples.push_back(sample);
        while inner
            .samples
            .front()
            .is_some_and(|oldest| oldest.time < horizon)
        {
            inner.samples.pop_front();
        }
        Ok(())
    }

    async fn speed_samples_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<SpeedSample>> {
        Ok(self
            .lock()
            .samples
            .iter()
            .filter(|sample| sample.time >= since)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(id: i64, percent_done: f64) -> Torrent {
        Torrent {
            id,
            percent_done,
            ..Torrent::default()
        }
    }

    #[tokio::test]
    async fn replace_is_authoritative_and_merge_is_not() {
        let store = MemoryStateStore::new();
        store
            .replace_torrents(vec![torrent(1, 0.2), torrent(2, 1.0)])
            .await
            .expect("replace");
        assert_eq!(store.torrent_ids().await.expect("ids"), vec![1, 2]);
        assert_eq!(store.active_torrent_ids().await.expect("active"), vec![1]);

        store
            .merge_torrents(vec![torrent(3, 0.5)])
            .await
            .expect("merge");
        assert_eq!(store.torrent_ids().await.expect("ids"), vec![1, 2, 3]);

        store
            .replace_torrents(vec![torrent(2, 1.0)])
            .await
            .expect("replace");
        assert_eq!(store.torrent_ids().await.expect("ids"), vec![2]);
    }

    #[tokio::test]
    async fn speed_roll_prunes_beyond_the_retention_window() {
        let store = MemoryStateStore::new();
        let now = Utc::now();
        for minutes_ago in [7, 6, 4, 2, 0] {
            store
                .push_speed_sample(SpeedSample {
                    time: now - Duration::minutes(minutes_ago),
                    download_bps: 100,
                    upload_bps: 10,
                })
                .await
                .expect("push");
        }
        let all = store
            .speed_samples_since(now - Duration::minutes(10))
            .await
            .expect("read");
        // The 7- and 6-minute samples fell outside the window.
        assert_eq!(all.len(), 3);
        let recent = store
            .speed_samples_since(now - Duration::minutes(3))
            .await
            .expect("read");
        assert_eq!(recent.len(), 2);
    }
}
