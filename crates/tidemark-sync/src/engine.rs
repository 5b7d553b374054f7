//! The long-lived sync service object.
//!
//! One [`SyncEngine`] is constructed at process start with every collaborator
//! injected, loads the notified-completions baseline exactly once, and is the
//! sole writer of the mirrored state store from then on.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tidemark_core::{CompletionNotifier, KeyValueStore, StateStore};
use tidemark_rpc::RpcClient;

use crate::error::{SyncError, SyncResult};

/// Durable key holding the already-notified completion ids.
pub(crate) const NOTIFIED_KEY: &str = "notified-completions";

/// Window during which an unforced refresh may use the incremental
/// strategy.
pub(crate) const INCREMENTAL_WINDOW: std::time::Duration = std::time::Duration::from_secs(60);

/// Behaviour knobs fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Whether completion events reach the notifier.
    pub notify_on_complete: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            notify_on_complete: true,
        }
    }
}

pub(crate) struct EngineState {
    /// Instant of the last successful torrent fetch, on the tokio clock.
    pub(crate) last_success: Option<tokio::time::Instant>,
    /// Ids already notified as complete; `None` until the durable baseline
    /// has been replaced once, which distinguishes a cold start.
    pub(crate) notified: Option<HashSet<i64>>,
}

/// Sync engine translating between the daemon's wire shape and the mirrored
/// store, choosing the cheapest correct reconciliation strategy.
pub struct SyncEngine {
    pub(crate) rpc: Arc<RpcClient>,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) notifier: Arc<dyn CompletionNotifier>,
    pub(crate) kv: Arc<dyn KeyValueStore>,
    pub(crate) options: EngineOptions,
    pub(crate) state: Mutex<EngineState>,
}

impl SyncEngine {
    /// Build the engine, reading the notified-completions baseline from
    /// durable storage exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Storage`] when the baseline cannot be read.
    pub async fn new(
        rpc: Arc<RpcClient>,
        store: Arc<dyn StateStore>,
        notifier: Arc<dyn CompletionNotifier>,
        kv: Arc<dyn KeyValueStore>,
        options: EngineOptions,
    ) -> SyncResult<Self> {
        let baseline = kv.get(NOTIFIED_KEY).await.map_err(SyncError::storage)?;
        let notified = baseline.map(|value| {
            value
                .as_array()
                .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default()
        });
        Ok(Self {
            rpc,
            store,
            notifier,
            kv,
            options,
            state: Mutex::new(EngineState {
                last_success: None,
                notified,
            }),
        })
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue one mutating RPC, then unconditionally refresh the mirror so it
    /// reflects the command's effect. A mutation failure takes precedence
    /// over the refresh outcome; otherwise the refresh result propagates.
    pub(crate) async fn mutate_then_refresh(
        &self,
        method: &str,
        arguments: Map<String, Value>,
    ) -> SyncResult<()> {
        let mutation = self.rpc.call(method, arguments).await;
        let refresh = self.refresh_torrents(true).await;
        mutation?;
        refresh
    }

    /// Issue one `session-set`, then refresh the settings singleton.
    pub(crate) async fn mutate_session(&self, arguments: Map<String, Value>) -> SyncResult<()> {
        self.rpc.call("session-set", arguments).await?;
        self.update_settings().await.map(|_| ())
    }
}
