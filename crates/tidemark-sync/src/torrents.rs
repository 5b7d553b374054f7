//! Torrent refresh, reconciliation, completion detection and actions.

use std::collections::HashSet;

use base64::Engine as _;
use base64::engine::general_purpose;
use chrono::Utc;
use serde_json::{Map, Value, json};
use tidemark_core::{BandwidthPriority, SpeedSample, Torrent, TorrentDetail};
use tidemark_rpc::BodyParser;
use tidemark_rpc::casing::field;
use tracing::{debug, info};

use crate::engine::{INCREMENTAL_WINDOW, NOTIFIED_KEY, SyncEngine};
use crate::error::{SyncError, SyncResult};
use crate::normalize;

/// Fields requested on every torrent fetch, in the daemon's oldest dialect.
const TORRENT_FIELDS: &[&str] = &[
    "id",
    "status",
    "error",
    "errorString",
    "name",
    "totalSize",
    "percentDone",
    "recheckProgress",
    "downloadedEver",
    "uploadedEver",
    "uploadRatio",
    "rateDownload",
    "rateUpload",
    "eta",
    "peersSendingToUs",
    "peersGettingFromUs",
    "peersConnected",
    "queuePosition",
    "addedDate",
    "doneDate",
    "downloadDir",
    "magnetLink",
    "hashString",
    "isStalled",
    "labels",
    "bandwidthPriority",
    "trackerStats",
];

/// Extra fields for the detail view.
const DETAIL_FIELDS: &[&str] = &["comment", "creator", "pieceCount", "pieceSize"];

/// Direction for queue reordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMove {
    /// Move to the front of the queue.
    Top,
    /// Move one slot towards the front.
    Up,
    /// Move one slot towards the back.
    Down,
    /// Move to the back of the queue.
    Bottom,
}

impl QueueMove {
    const fn method(self) -> &'static str {
        match self {
            Self::Top => "queue-move-top",
            Self::Up => "queue-move-up",
            Self::Down => "queue-move-down",
            Self::Bottom => "queue-move-bottom",
        }
    }
}

/// Request payload for admitting a torrent to the daemon.
#[derive(Debug, Clone, Default)]
pub struct AddTorrentRequest {
    /// Magnet URI; takes precedence when both sources are set.
    pub magnet: Option<String>,
    /// Raw `.torrent` metainfo bytes.
    pub metainfo: Option<Vec<u8>>,
    /// Download directory override.
    pub download_dir: Option<String>,
    /// Whether to add in the paused state.
    pub paused: Option<bool>,
}

/// Outcome of an add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The daemon admitted a new torrent.
    Added {
        /// Server-assigned id.
        id: i64,
        /// Torrent name.
        name: String,
    },
    /// The daemon already had this torrent.
    Duplicate {
        /// Id of the existing torrent.
        id: i64,
        /// Name of the existing torrent.
        name: String,
    },
}

fn ids_value(ids: &[i64]) -> Value {
    Value::Array(ids.iter().map(|id| json!(id)).collect())
}

fn fields_value(extra: &[&str]) -> Value {
    Value::Array(
        TORRENT_FIELDS
            .iter()
            .chain(extra)
            .map(|name| json!(name))
            .collect(),
    )
}

impl SyncEngine {
    /// Refresh the mirrored torrent set.
    ///
    /// Unforced refreshes within [`INCREMENTAL_WINDOW`] of the previous
    /// success ask only for recently active records and apply the daemon's
    /// explicit removals; anything else fetches the full set, which then
    /// becomes authoritative. Completion detection and one speed sample run
    /// after every reconciliation.
    ///
    /// # Errors
    ///
    /// Propagates transport and storage failures unswallowed.
    pub async fn refresh_torrents(&self, force: bool) -> SyncResult<()> {
        let incremental = !force
            && self
                .lock_state()
                .last_success
                .is_some_and(|at| at.elapsed() < INCREMENTAL_WINDOW);

        let mut arguments = Map::new();
        arguments.insert("fields".to_string(), fields_value(&[]));
        if incremental {
            arguments.insert("ids".to_string(), json!("recently-active"));
        }
        let response = self
            .rpc
            .call_with_parser("torrent-get", arguments, BodyParser::Repairing)
            .await?;

        let torrents: Vec<Torrent> = normalize::get_array(&response, "torrents")
            .iter()
            .filter_map(Value::as_object)
            .map(normalize::torrent)
            .collect();
        debug!(
            count = torrents.len(),
            incremental, "reconciling torrent records"
        );

        if incremental {
            let removed: Vec<i64> = normalize::get_array(&response, "removed")
                .iter()
                .filter_map(Value::as_i64)
                .collect();
            if !removed.is_empty() {
                info!(count = removed.len(), "applying reported removals");
                self.store
                    .remove_torrents(&removed)
                    .await
                    .map_err(SyncError::store)?;
            }
            self.store
                .merge_torrents(torrents)
                .await
                .map_err(SyncError::store)?;
        } else {
            self.store
                .replace_torrents(torrents)
                .await
                .map_err(SyncError::store)?;
        }

        self.lock_state().last_success = Some(tokio::time::Instant::now());
        self.record_speed_sample().await?;
        self.detect_completions().await?;
        Ok(())
    }

    async fn record_speed_sample(&self) -> SyncResult<()> {
        let ids = self.store.torrent_ids().await.map_err(SyncError::store)?;
        let mut download_bps = 0;
        let mut upload_bps = 0;
        for id in ids {
            if let Some(torrent) = self.store.torrent(id).await.map_err(SyncError::store)? {
                download_bps += torrent.rate_download;
                upload_bps += torrent.rate_upload;
            }
        }
        self.store
            .push_speed_sample(SpeedSample {
                time: Utc::now(),
                download_bps,
                upload_bps,
            })
            .await
            .map_err(SyncError::store)
    }

    /// Compare the freshly computed completed-id set against the baseline
    /// loaded at startup, fire exactly one notification per newly completed
    /// id, and persist the new set wholesale.
    async fn detect_completions(&self) -> SyncResult<()> {
        let all: HashSet<i64> = self
            .store
            .torrent_ids()
            .await
            .map_err(SyncError::store)?
            .into_iter()
            .collect();
        let active: HashSet<i64> = self
            .store
            .active_torrent_ids()
            .await
            .map_err(SyncError::store)?
            .into_iter()
            .collect();
        let completed: HashSet<i64> = all.difference(&active).copied().collect();

        let baseline = self.lock_state().notified.clone();
        if let Some(baseline) = baseline
            && self.options.notify_on_complete
        {
            let mut fresh: Vec<i64> = completed.difference(&baseline).copied().collect();
            fresh.sort_unstable();
            for id in fresh {
                if let Some(torrent) = self.store.torrent(id).await.map_err(SyncError::store)? {
                    info!(id, name = %torrent.name, "torrent completed");
                    self.notifier.torrent_completed(&torrent).await;
                }
            }
        }

        let mut persisted: Vec<i64> = completed.iter().copied().collect();
        persisted.sort_unstable();
        self.kv
            .set(NOTIFIED_KEY, json!(persisted))
            .await
            .map_err(SyncError::storage)?;
        self.lock_state().notified = Some(completed);
        Ok(())
    }

    async fn action(&self, method: &str, ids: &[i64]) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        self.mutate_then_refresh(method, arguments).await
    }

    /// Start the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn start_torrents(&self, ids: &[i64]) -> SyncResult<()> {
        self.action("torrent-start", ids).await
    }

    /// Stop the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn stop_torrents(&self, ids: &[i64]) -> SyncResult<()> {
        self.action("torrent-stop", ids).await
    }

    /// Start the given torrents immediately, bypassing the queue.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn force_start_torrents(&self, ids: &[i64]) -> SyncResult<()> {
        self.action("torrent-start-now", ids).await
    }

    /// Verify the given torrents' local data.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn verify_torrents(&self, ids: &[i64]) -> SyncResult<()> {
        self.action("torrent-verify", ids).await
    }

    /// Ask the daemon to reannounce to trackers. Fire-and-forget: the only
    /// action that does not chain a refresh, since it changes no mirrored
    /// state.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn reannounce_torrents(&self, ids: &[i64]) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        self.rpc.call("torrent-reannounce", arguments).await?;
        Ok(())
    }

    /// Remove torrents, optionally deleting downloaded data.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn remove_torrents(&self, ids: &[i64], delete_data: bool) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        arguments.insert("delete-local-data".to_string(), json!(delete_data));
        self.mutate_then_refresh("torrent-remove", arguments).await
    }

    /// Reorder torrents within the daemon's queue.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn queue_move(&self, ids: &[i64], direction: QueueMove) -> SyncResult<()> {
        self.action(direction.method(), ids).await
    }

    /// Rename a path within one torrent.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn rename_path(&self, id: i64, path: &str, name: &str) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(&[id]));
        arguments.insert("path".to_string(), json!(path));
        arguments.insert("name".to_string(), json!(name));
        self.mutate_then_refresh("torrent-rename-path", arguments)
            .await
    }

    /// Move torrents to a new location.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn move_torrents(
        &self,
        ids: &[i64],
        location: &str,
        move_data: bool,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        arguments.insert("location".to_string(), json!(location));
        arguments.insert("move".to_string(), json!(move_data));
        self.mutate_then_refresh("torrent-set-location", arguments)
            .await
    }

    /// Replace one torrent's labels.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn set_labels(&self, id: i64, labels: &[String]) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(&[id]));
        arguments.insert("labels".to_string(), json!(labels));
        self.mutate_then_refresh("torrent-set", arguments).await
    }

    /// Set the bandwidth priority for the given torrents.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn set_bandwidth_priority(
        &self,
        ids: &[i64],
        priority: BandwidthPriority,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        arguments.insert("bandwidthPriority".to_string(), json!(priority.to_code()));
        self.mutate_then_refresh("torrent-set", arguments).await
    }

    /// Replace one torrent's tracker list; each entry is one tier.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn set_tracker_list(&self, id: i64, trackers: &[String]) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(&[id]));
        arguments.insert("trackerList".to_string(), json!(trackers.join("\n\n")));
        self.mutate_then_refresh("torrent-set", arguments).await
    }

    /// Override seed limits per torrent; `None` falls back to the session
    /// default for that limit.
    ///
    /// # Errors
    ///
    /// Propagates transport failures from the mutation or chained refresh.
    pub async fn set_seed_limits(
        &self,
        ids: &[i64],
        ratio_limit: Option<f64>,
        idle_minutes: Option<u64>,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(ids));
        match ratio_limit {
            Some(ratio) => {
                arguments.insert("seedRatioLimit".to_string(), json!(ratio));
                arguments.insert("seedRatioMode".to_string(), json!(1));
            }
            None => {
                arguments.insert("seedRatioMode".to_string(), json!(0));
            }
        }
        match idle_minutes {
            Some(minutes) => {
                arguments.insert("seedIdleLimit".to_string(), json!(minutes));
                arguments.insert("seedIdleMode".to_string(), json!(1));
            }
            None => {
                arguments.insert("seedIdleMode".to_string(), json!(0));
            }
        }
        self.mutate_then_refresh("torrent-set", arguments).await
    }

    /// Admit a torrent by magnet link or metainfo. Duplicates are routed to
    /// the notifier's duplicate callback; failures are both surfaced to the
    /// caller and forwarded to the notifier as a user-facing message.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; [`SyncError::Wire`] when the response
    /// names neither an added nor a duplicate torrent.
    pub async fn add_torrent(&self, request: AddTorrentRequest) -> SyncResult<AddOutcome> {
        let mut arguments = Map::new();
        if let Some(magnet) = &request.magnet {
            arguments.insert("filename".to_string(), json!(magnet));
        } else if let Some(metainfo) = &request.metainfo {
            let encoded = general_purpose::STANDARD.encode(metainfo);
            arguments.insert("metainfo".to_string(), json!(encoded));
        }
        if let Some(dir) = &request.download_dir {
            arguments.insert("download-dir".to_string(), json!(dir));
        }
        if let Some(paused) = request.paused {
            arguments.insert("paused".to_string(), json!(paused));
        }

        let response = match self.rpc.call("torrent-add", arguments).await {
            Ok(response) => response,
            Err(err) => {
                self.notifier
                    .error(&format!("failed to add torrent: {err}"))
                    .await;
                return Err(err.into());
            }
        };

        if let Some(duplicate) = field(&response, "torrent-duplicate").and_then(Value::as_object) {
            let name = normalize::get_string(duplicate, "name");
            let id = normalize::get_i64(duplicate, "id", 0);
            self.notifier.duplicate_torrent(&name).await;
            self.refresh_torrents(true).await?;
            return Ok(AddOutcome::Duplicate { id, name });
        }

        let added = field(&response, "torrent-added")
            .and_then(Value::as_object)
            .ok_or_else(|| SyncError::wire("torrent-add response names no torrent"))?;
        let outcome = AddOutcome::Added {
            id: normalize::get_i64(added, "id", 0),
            name: normalize::get_string(added, "name"),
        };
        self.refresh_torrents(true).await?;
        Ok(outcome)
    }

    /// Fetch the detailed view of one torrent, including tracker
    /// statistics. Uses the repairing parser since tracker fields may carry
    /// unescaped control characters.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; [`SyncError::Wire`] when the daemon
    /// does not return the torrent.
    pub async fn torrent_details(&self, id: i64) -> SyncResult<TorrentDetail> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(&[id]));
        arguments.insert("fields".to_string(), fields_value(DETAIL_FIELDS));
        let response = self
            .rpc
            .call_with_parser("torrent-get", arguments, BodyParser::Repairing)
            .await?;

        let record = normalize::get_array(&response, "torrents")
            .first()
            .and_then(Value::as_object)
            .ok_or_else(|| SyncError::wire(format!("torrent {id} absent from detail response")))?;

        Ok(TorrentDetail {
            torrent: normalize::torrent(record),
            trackers: normalize::get_array(record, "trackerStats")
                .iter()
                .filter_map(Value::as_object)
                .map(normalize::tracker_stat)
                .collect(),
            comment: normalize::get_string(record, "comment"),
            creator: normalize::get_string(record, "creator"),
            piece_count: normalize::get_u64(record, "pieceCount", 0),
            piece_size: normalize::get_u64(record, "pieceSize", 0),
        })
    }

    /// Fetch the connected peers of one torrent.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn torrent_peers(&self, id: i64) -> SyncResult<Vec<tidemark_core::PeerSnapshot>> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), ids_value(&[id]));
        arguments.insert("fields".to_string(), json!(["id", "peers"]));
        let response = self.rpc.call("torrent-get", arguments).await?;
        Ok(normalize::get_array(&response, "torrents")
            .first()
            .and_then(Value::as_object)
            .map(|record| normalize::get_array(record, "peers"))
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_object)
            .map(normalize::peer)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use serde_json::json;
    use tidemark_core::{CompletionNotifier, KeyValueStore, StateStore};
    use tidemark_rpc::{NullEvents, RpcClient, RpcHttp};
    use tidemark_store::MemoryStateStore;
    use tidemark_test_support::{
        MemoryKv, NotifierEvent, RecordingNotifier, ScriptedHttp, ScriptedReply, torrent_record,
    };

    use super::*;
    use crate::engine::{EngineOptions, SyncEngine};

    struct Harness {
        engine: SyncEngine,
        http: Arc<ScriptedHttp>,
        store: Arc<MemoryStateStore>,
        notifier: Arc<RecordingNotifier>,
        kv: Arc<MemoryKv>,
    }

    async fn harness(
        script: Vec<ScriptedReply>,
        notified_baseline: Option<Value>,
        options: EngineOptions,
    ) -> Harness {
        let http = Arc::new(ScriptedHttp::new(script));
        let rpc = Arc::new(RpcClient::new(
            Arc::clone(&http) as Arc<dyn RpcHttp>,
            None,
            Arc::new(NullEvents),
        ));
        let store = Arc::new(MemoryStateStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let kv = Arc::new(MemoryKv::default());
        if let Some(baseline) = notified_baseline {
            kv.seed(NOTIFIED_KEY, baseline);
        }
        let engine = SyncEngine::new(
            rpc,
            Arc::clone(&store) as Arc<dyn StateStore>,
            Arc::clone(&notifier) as Arc<dyn CompletionNotifier>,
            Arc::clone(&kv) as Arc<dyn KeyValueStore>,
            options,
        )
        .await
        .expect("engine construction");
        Harness {
            engine,
            http,
            store,
            notifier,
            kv,
        }
    }

    fn torrents_reply(torrents: Vec<Value>) -> ScriptedReply {
        ScriptedReply::success(json!({"torrents": torrents}))
    }

    #[tokio::test(start_paused = true)]
    async fn unforced_refresh_within_window_is_incremental() {
        let h = harness(
            vec![
                torrents_reply(vec![torrent_record(1, 4, 0.2), torrent_record(2, 4, 0.4)]),
                ScriptedReply::success(json!({
                    "torrents": [torrent_record(3, 4, 0.1)],
                    "removed": [1],
                })),
            ],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine.refresh_torrents(false).await.expect("full sync");
        h.engine
            .refresh_torrents(false)
            .await
            .expect("incremental sync");

        let bodies = h.http.bodies();
        assert!(!bodies[0].contains("recently-active"));
        assert!(bodies[1].contains("recently-active"));
        let ids: Vec<i64> = h.store.torrents().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn window_expiry_and_force_both_select_full_sync() {
        let h = harness(
            vec![
                torrents_reply(vec![torrent_record(1, 4, 0.2)]),
                torrents_reply(vec![torrent_record(2, 4, 0.2)]),
                torrents_reply(vec![torrent_record(3, 4, 0.2)]),
            ],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine.refresh_torrents(false).await.expect("first");
        tokio::time::advance(std::time::Duration::from_secs(61)).await;
        h.engine.refresh_torrents(false).await.expect("expired");
        h.engine.refresh_torrents(true).await.expect("forced");

        for body in h.http.bodies() {
            assert!(!body.contains("recently-active"));
        }
        // Full syncs are authoritative: only the last fetch survives.
        let ids: Vec<i64> = h.store.torrents().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[tokio::test]
    async fn cold_start_suppresses_completion_notifications() {
        let h = harness(
            vec![torrents_reply(vec![
                torrent_record(7, 6, 1.0),
                torrent_record(8, 4, 0.5),
            ])],
            None,
            EngineOptions::default(),
        )
        .await;

        h.engine.refresh_torrents(true).await.expect("sync");

        assert!(h.notifier.events().is_empty());
        // The baseline is still persisted so the next run starts warm.
        assert_eq!(h.kv.peek(NOTIFIED_KEY), Some(json!([7])));
    }

    #[tokio::test]
    async fn completions_notify_exactly_once_per_id() {
        let h = harness(
            vec![
                torrents_reply(vec![
                    torrent_record(1, 6, 1.0),
                    torrent_record(2, 6, 1.0),
                    torrent_record(3, 6, 1.0),
                    torrent_record(4, 4, 0.5),
                ]),
                torrents_reply(vec![]),
            ],
            Some(json!([1, 2])),
            EngineOptions::default(),
        )
        .await;

        h.engine.refresh_torrents(true).await.expect("first sync");
        assert_eq!(h.notifier.completed_ids(), vec![3]);
        assert_eq!(h.kv.peek(NOTIFIED_KEY), Some(json!([1, 2, 3])));

        h.engine.refresh_torrents(false).await.expect("second sync");
        assert_eq!(h.notifier.completed_ids(), vec![3]);
    }

    #[tokio::test]
    async fn disabled_notifications_still_persist_the_completed_set() {
        let h = harness(
            vec![torrents_reply(vec![torrent_record(9, 6, 1.0)])],
            Some(json!([])),
            EngineOptions {
                notify_on_complete: false,
            },
        )
        .await;

        h.engine.refresh_torrents(true).await.expect("sync");

        assert!(h.notifier.events().is_empty());
        assert_eq!(h.kv.peek(NOTIFIED_KEY), Some(json!([9])));
    }

    #[tokio::test]
    async fn every_refresh_appends_one_speed_sample() {
        let h = harness(
            vec![torrents_reply(vec![
                torrent_record(1, 4, 0.2),
                torrent_record(2, 4, 0.4),
            ])],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine.refresh_torrents(true).await.expect("sync");

        let samples = h
            .store
            .speed_samples_since(Utc::now() - ChronoDuration::minutes(1))
            .await
            .expect("samples");
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].download_bps, 4_000);
        assert_eq!(samples[0].upload_bps, 2_000);
    }

    #[tokio::test]
    async fn actions_chain_a_forced_refresh() {
        let h = harness(
            vec![
                ScriptedReply::success(json!({})),
                torrents_reply(vec![torrent_record(5, 4, 0.2)]),
            ],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine.start_torrents(&[5]).await.expect("start");

        let bodies = h.http.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].contains("\"method\":\"torrent-start\""));
        assert!(bodies[0].contains("\"ids\":[5]"));
        assert!(bodies[1].contains("\"method\":\"torrent-get\""));
        assert_eq!(h.store.torrents().len(), 1);
    }

    #[tokio::test]
    async fn failed_mutation_still_refreshes_and_takes_precedence() {
        let h = harness(
            vec![
                ScriptedReply::remote_failure("invalid argument"),
                torrents_reply(vec![torrent_record(5, 4, 0.2)]),
            ],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        let err = h
            .engine
            .stop_torrents(&[5])
            .await
            .expect_err("mutation failure surfaces");
        assert!(matches!(err, SyncError::Rpc { .. }));
        assert_eq!(h.http.attempts().len(), 2);
        assert_eq!(h.store.torrents().len(), 1);
    }

    #[tokio::test]
    async fn reannounce_is_fire_and_forget() {
        let h = harness(
            vec![ScriptedReply::success(json!({}))],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine.reannounce_torrents(&[1, 2]).await.expect("ok");
        assert_eq!(h.http.attempts().len(), 1);
    }

    #[tokio::test]
    async fn add_torrent_routes_duplicates_to_the_notifier() {
        let h = harness(
            vec![
                ScriptedReply::success(json!({
                    "torrent-duplicate": {"id": 9, "name": "already-there"},
                })),
                torrents_reply(vec![torrent_record(9, 6, 1.0)]),
            ],
            Some(json!([9])),
            EngineOptions::default(),
        )
        .await;

        let outcome = h
            .engine
            .add_torrent(AddTorrentRequest {
                magnet: Some("magnet:?xt=urn:btih:abc".to_string()),
                ..AddTorrentRequest::default()
            })
            .await
            .expect("duplicate outcome");

        assert_eq!(
            outcome,
            AddOutcome::Duplicate {
                id: 9,
                name: "already-there".to_string(),
            }
        );
        assert_eq!(
            h.notifier.events(),
            vec![NotifierEvent::Duplicate("already-there".to_string())]
        );
    }

    #[tokio::test]
    async fn add_torrent_failure_notifies_and_surfaces() {
        let h = harness(
            vec![ScriptedReply::remote_failure("unrecognized info")],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        let err = h
            .engine
            .add_torrent(AddTorrentRequest {
                metainfo: Some(b"d8:announce0:e".to_vec()),
                ..AddTorrentRequest::default()
            })
            .await
            .expect_err("failure surfaces");
        assert!(matches!(err, SyncError::Rpc { .. }));
        assert!(matches!(
            h.notifier.events().as_slice(),
            [NotifierEvent::Error(_)]
        ));
    }

    #[tokio::test]
    async fn seed_limit_overrides_toggle_the_per_torrent_modes() {
        let h = harness(
            vec![
                ScriptedReply::success(json!({})),
                torrents_reply(vec![]),
            ],
            Some(json!([])),
            EngineOptions::default(),
        )
        .await;

        h.engine
            .set_seed_limits(&[4], Some(1.5), None)
            .await
            .expect("seed limits");

        let body = &h.http.bodies()[0];
        assert!(body.contains("\"seedRatioLimit\":1.5"));
        assert!(body.contains("\"seedRatioMode\":1"));
        assert!(body.contains("\"seedIdleMode\":0"));
    }
}
