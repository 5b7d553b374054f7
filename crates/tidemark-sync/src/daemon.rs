//! Periodic polling supervisor.
//!
//! The daemon owns no timer itself: it arms one named schedule on the
//! injected [`RefreshScheduler`] and reacts to its ticks, so the cadence
//! survives whatever restart semantics the scheduler implementation has.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tidemark_core::RefreshScheduler;
use tracing::{error, info, warn};

use crate::engine::SyncEngine;
use crate::error::SyncResult;

/// Name of the schedule the daemon arms for its periodic refresh.
pub const REFRESH_SCHEDULE: &str = "torrent-refresh";

/// Consecutive refresh failures tolerated before polling stops.
const FAILURE_LIMIT: u32 = 3;

/// Whatever the daemon polls on each tick.
#[async_trait]
pub trait Refresher: Send + Sync {
    /// Run one refresh; `force` bypasses the incremental strategy.
    async fn refresh(&self, force: bool) -> SyncResult<()>;
}

#[async_trait]
impl Refresher for SyncEngine {
    async fn refresh(&self, force: bool) -> SyncResult<()> {
        self.refresh_torrents(force).await
    }
}

struct DaemonState {
    active: bool,
    failures: u32,
    in_progress: bool,
}

/// Supervisor driving periodic refreshes with an overlap guard and a
/// consecutive-failure cutoff.
pub struct PollDaemon {
    refresher: Arc<dyn Refresher>,
    scheduler: Arc<dyn RefreshScheduler>,
    interval_ms: u64,
    state: Mutex<DaemonState>,
}

/// Clears the in-progress flag even when a refresh panics mid-tick.
struct InFlight<'a>(&'a PollDaemon);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.lock().in_progress = false;
    }
}

impl PollDaemon {
    /// Build an inactive daemon; nothing runs until [`Self::start`].
    #[must_use]
    pub const fn new(
        refresher: Arc<dyn Refresher>,
        scheduler: Arc<dyn RefreshScheduler>,
        interval_ms: u64,
    ) -> Self {
        Self {
            refresher,
            scheduler,
            interval_ms,
            state: Mutex::new(DaemonState {
                active: false,
                failures: 0,
                in_progress: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DaemonState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the daemon is currently polling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Consecutive failures since the last successful refresh.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().failures
    }

    /// Arm the refresh schedule. Intervals below one second disable polling
    /// entirely. The scheduler works at minute resolution, so sub-minute
    /// intervals floor to one minute. Starting while already active re-arms
    /// the schedule and resets the consecutive-failure count.
    ///
    /// # Errors
    ///
    /// Propagates scheduler failures.
    pub async fn start(&self) -> anyhow::Result<()> {
        if self.interval_ms < 1000 {
            info!(interval_ms = self.interval_ms, "polling disabled");
            return Ok(());
        }
        {
            let mut state = self.lock();
            state.active = true;
            state.failures = 0;
        }
        let period_minutes = (self.interval_ms / 60_000).max(1);
        info!(period_minutes, "arming refresh schedule");
        self.scheduler
            .schedule(REFRESH_SCHEDULE, period_minutes)
            .await
    }

    /// Stop polling and cancel the schedule. Idempotent; cancellation
    /// failures are logged rather than surfaced since the daemon is already
    /// inactive.
    pub async fn stop(&self) {
        {
            let mut state = self.lock();
            if !state.active {
                return;
            }
            state.active = false;
        }
        info!("polling stopped");
        if let Err(err) = self.scheduler.cancel(REFRESH_SCHEDULE).await {
            warn!(error = %err, "failed to cancel refresh schedule");
        }
    }

    /// Handle one schedule tick. Skipped while inactive or while a previous
    /// refresh is still running; more than [`FAILURE_LIMIT`] consecutive
    /// failures stop the daemon.
    pub async fn on_tick(&self) {
        {
            let mut state = self.lock();
            if !state.active || state.in_progress {
                return;
            }
            state.in_progress = true;
        }
        let guard = InFlight(self);
        let result = self.refresher.refresh(false).await;
        drop(guard);

        let cutoff = {
            let mut state = self.lock();
            match result {
                Ok(()) => {
                    state.failures = 0;
                    false
                }
                Err(err) => {
                    state.failures += 1;
                    warn!(
                        error = %err,
                        consecutive = state.failures,
                        "scheduled refresh failed"
                    );
                    state.failures > FAILURE_LIMIT
                }
            }
        };
        if cutoff {
            error!("too many consecutive refresh failures");
            self.stop().await;
        }
    }
}
