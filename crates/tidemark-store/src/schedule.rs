//! Tokio-interval adapter for the wake-up scheduler contract.
//!
//! The real contract is a restart-durable OS alarm; this adapter is the
//! in-process stand-in for embedders without one. Schedules die with the
//! process, which is acceptable because the daemon re-arms its schedule on
//! every start.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng as _;
use tidemark_core::RefreshScheduler;
use tokio::task::JoinHandle;
use tracing::debug;

/// Receiver of due wake-ups.
#[async_trait]
pub trait TickHandler: Send + Sync {
    /// A named schedule became due.
    async fn tick(&self, name: &str);
}

/// In-process scheduler backed by `tokio::time::interval`.
#[derive(Default)]
pub struct TokioScheduler {
    handler: Mutex<Option<Arc<dyn TickHandler>>>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    /// Scheduler with no handler yet; arm one with [`Self::set_handler`]
    /// before scheduling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the tick receiver. Must happen before the first `schedule`.
    pub fn set_handler(&self, handler: Arc<dyn TickHandler>) {
        *lock(&self.handler) = Some(handler);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl RefreshScheduler for TokioScheduler {
    async fn schedule(&self, name: &str, period_minutes: u64) -> anyhow::Result<()> {
        let handler = lock(&self.handler)
            .clone()
            .ok_or_else(|| anyhow::anyhow!("scheduler has no tick handler installed"))?;

        let period = Duration::from_secs(period_minutes.max(1) * 60);
        // Spread first fires so several mirrors do not hit the daemon at once.
        let jitter = Duration::from_millis(rand::rng().random_range(0..5_000));
        let owned_name = name.to_string();
        debug!(name, period_minutes, "arming refresh schedule");

        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period + jitter;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                handler.tick(&owned_name).await;
            }
        });

        if let Some(previous) = lock(&self.tasks).insert(name.to_string(), task) {
            previous.abort();
        }
        Ok(())
    }

    async fn cancel(&self, name: &str) -> anyhow::Result<()> {
        if let Some(task) = lock(&self.tasks).remove(name) {
            debug!(name, "cancelling refresh schedule");
            task.abort();
        }
        Ok(())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for task in lock(&self.tasks).values() {
            task.abort();
        }
    }
}
