//! Session settings: the normalized singleton and its mutators.
//!
//! Every mutator goes through `session-set` and then re-fetches the
//! singleton, so the mirrored settings always reflect what the daemon
//! actually accepted rather than what was requested.

use serde_json::{Map, json};
use tidemark_core::SessionSettings;
use tracing::info;

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::normalize;

impl SyncEngine {
    /// Fetch the session-settings singleton, normalize it into the store and
    /// teach the transport the daemon's protocol version.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn update_settings(&self) -> SyncResult<SessionSettings> {
        let response = self.rpc.call("session-get", Map::new()).await?;
        let settings = normalize::settings(&response);
        self.rpc.record_protocol_version(settings.rpc_version);
        self.store
            .replace_settings(settings.clone())
            .await
            .map_err(SyncError::store)?;
        Ok(settings)
    }

    /// Set the global speed limits in kB/s; `None` disables a limit.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_speed_limits(
        &self,
        download_kbps: Option<u64>,
        upload_kbps: Option<u64>,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        match download_kbps {
            Some(limit) => {
                arguments.insert("speed-limit-down".to_string(), json!(limit));
                arguments.insert("speed-limit-down-enabled".to_string(), json!(true));
            }
            None => {
                arguments.insert("speed-limit-down-enabled".to_string(), json!(false));
            }
        }
        match upload_kbps {
            Some(limit) => {
                arguments.insert("speed-limit-up".to_string(), json!(limit));
                arguments.insert("speed-limit-up-enabled".to_string(), json!(true));
            }
            None => {
                arguments.insert("speed-limit-up-enabled".to_string(), json!(false));
            }
        }
        self.mutate_session(arguments).await
    }

    /// Toggle the alternative speed limits and set their values in kB/s.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_alt_speed(
        &self,
        enabled: bool,
        download_kbps: u64,
        upload_kbps: u64,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("alt-speed-enabled".to_string(), json!(enabled));
        arguments.insert("alt-speed-down".to_string(), json!(download_kbps));
        arguments.insert("alt-speed-up".to_string(), json!(upload_kbps));
        self.mutate_session(arguments).await
    }

    /// Configure the alternative-speed schedule. `begin` and `end` are
    /// minutes after midnight; `days` is the daemon's day bitmask.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_alt_speed_schedule(
        &self,
        enabled: bool,
        begin: u64,
        end: u64,
        days: u64,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("alt-speed-time-enabled".to_string(), json!(enabled));
        arguments.insert("alt-speed-time-begin".to_string(), json!(begin));
        arguments.insert("alt-speed-time-end".to_string(), json!(end));
        arguments.insert("alt-speed-time-day".to_string(), json!(days));
        self.mutate_session(arguments).await
    }

    /// Set the global and per-torrent peer limits.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_peer_limits(&self, global: u64, per_torrent: u64) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("peer-limit-global".to_string(), json!(global));
        arguments.insert("peer-limit-per-torrent".to_string(), json!(per_torrent));
        self.mutate_session(arguments).await
    }

    /// Configure the download and seed queues; `None` disables a queue.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_queue_sizes(
        &self,
        download: Option<u64>,
        seed: Option<u64>,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        match download {
            Some(size) => {
                arguments.insert("download-queue-size".to_string(), json!(size));
                arguments.insert("download-queue-enabled".to_string(), json!(true));
            }
            None => {
                arguments.insert("download-queue-enabled".to_string(), json!(false));
            }
        }
        match seed {
            Some(size) => {
                arguments.insert("seed-queue-size".to_string(), json!(size));
                arguments.insert("seed-queue-enabled".to_string(), json!(true));
            }
            None => {
                arguments.insert("seed-queue-enabled".to_string(), json!(false));
            }
        }
        self.mutate_session(arguments).await
    }

    /// Configure stalled-torrent detection for queueing purposes.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_stalled_policy(&self, enabled: bool, minutes: u64) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("queue-stalled-enabled".to_string(), json!(enabled));
        arguments.insert("queue-stalled-minutes".to_string(), json!(minutes));
        self.mutate_session(arguments).await
    }

    /// Set the connection encryption policy: `required`, `preferred` or
    /// `tolerated`.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_encryption(&self, policy: &str) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("encryption".to_string(), json!(policy));
        self.mutate_session(arguments).await
    }

    /// Toggle the peer-discovery protocols.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_network_protocols(
        &self,
        dht: bool,
        pex: bool,
        lpd: bool,
        utp: bool,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("dht-enabled".to_string(), json!(dht));
        arguments.insert("pex-enabled".to_string(), json!(pex));
        arguments.insert("lpd-enabled".to_string(), json!(lpd));
        arguments.insert("utp-enabled".to_string(), json!(utp));
        self.mutate_session(arguments).await
    }

    /// Enable or disable the blocklist, optionally replacing its URL.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_blocklist(&self, enabled: bool, url: Option<&str>) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("blocklist-enabled".to_string(), json!(enabled));
        if let Some(url) = url {
            arguments.insert("blocklist-url".to_string(), json!(url));
        }
        self.mutate_session(arguments).await
    }

    /// Set the default download directory.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_download_dir(&self, path: &str) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("download-dir".to_string(), json!(path));
        self.mutate_session(arguments).await
    }

    /// Configure the incomplete-files directory.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_incomplete_dir(&self, enabled: bool, path: &str) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("incomplete-dir-enabled".to_string(), json!(enabled));
        arguments.insert("incomplete-dir".to_string(), json!(path));
        self.mutate_session(arguments).await
    }

    /// Toggle the `.part` suffix on incomplete files.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_rename_partial(&self, enabled: bool) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("rename-partial-files".to_string(), json!(enabled));
        self.mutate_session(arguments).await
    }

    /// Configure the script run when a torrent finishes.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_done_script(&self, enabled: bool, path: &str) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("script-torrent-done-enabled".to_string(), json!(enabled));
        arguments.insert("script-torrent-done-filename".to_string(), json!(path));
        self.mutate_session(arguments).await
    }

    /// Configure the listening port and port forwarding.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_peer_port(
        &self,
        port: u64,
        random_on_start: bool,
        forwarding: bool,
    ) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("peer-port".to_string(), json!(port));
        arguments.insert("peer-port-random-on-start".to_string(), json!(random_on_start));
        arguments.insert("port-forwarding-enabled".to_string(), json!(forwarding));
        self.mutate_session(arguments).await
    }

    /// Set the session-wide seed ratio limit; `None` disables it.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_seed_ratio_limit(&self, ratio: Option<f64>) -> SyncResult<()> {
        let mut arguments = Map::new();
        match ratio {
            Some(ratio) => {
                arguments.insert("seedRatioLimit".to_string(), json!(ratio));
                arguments.insert("seedRatioLimited".to_string(), json!(true));
            }
            None => {
                arguments.insert("seedRatioLimited".to_string(), json!(false));
            }
        }
        self.mutate_session(arguments).await
    }

    /// Set the session-wide idle seeding limit in minutes; `None` disables
    /// it.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_idle_seed_limit(&self, minutes: Option<u64>) -> SyncResult<()> {
        let mut arguments = Map::new();
        match minutes {
            Some(minutes) => {
                arguments.insert("idle-seeding-limit".to_string(), json!(minutes));
                arguments.insert("idle-seeding-limit-enabled".to_string(), json!(true));
            }
            None => {
                arguments.insert("idle-seeding-limit-enabled".to_string(), json!(false));
            }
        }
        self.mutate_session(arguments).await
    }

    /// Toggle whether admitted torrents start immediately.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn set_start_added_torrents(&self, enabled: bool) -> SyncResult<()> {
        let mut arguments = Map::new();
        arguments.insert("start-added-torrents".to_string(), json!(enabled));
        self.mutate_session(arguments).await
    }

    /// Free space in bytes at a daemon-side path.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; [`SyncError::Wire`] when the daemon
    /// reports no usable size.
    pub async fn free_space(&self, path: &str) -> SyncResult<u64> {
        let mut arguments = Map::new();
        arguments.insert("path".to_string(), json!(path));
        let response = self.rpc.call("free-space", arguments).await?;
        let size = normalize::get_i64(&response, "size-bytes", -1);
        if size < 0 {
            return Err(SyncError::wire(format!(
                "free-space reported no size for {path}"
            )));
        }
        Ok(size.unsigned_abs())
    }

    /// Whether the daemon's listening port is reachable from outside.
    ///
    /// # Errors
    ///
    /// Propagates transport failures.
    pub async fn port_test(&self) -> SyncResult<bool> {
        let response = self.rpc.call("port-test", Map::new()).await?;
        Ok(normalize::get_bool(&response, "port-is-open", false))
    }

    /// Trigger a blocklist update and refresh the settings singleton, which
    /// carries the new blocklist size.
    ///
    /// # Errors
    ///
    /// Propagates transport and store failures.
    pub async fn blocklist_update(&self) -> SyncResult<u64> {
        let response = self.rpc.call("blocklist-update", Map::new()).await?;
        let size = normalize::get_u64(&response, "blocklist-size", 0);
        info!(size, "blocklist updated");
        self.update_settings().await?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tidemark_core::StateStore;
    use tidemark_rpc::{NullEvents, RpcClient, RpcHttp, SNAKE_CASE_RPC_VERSION};
    use tidemark_store::MemoryStateStore;
    use tidemark_test_support::{MemoryKv, RecordingNotifier, ScriptedHttp, ScriptedReply};

    use super::*;
    use crate::engine::EngineOptions;

    struct Harness {
        engine: SyncEngine,
        http: Arc<ScriptedHttp>,
        store: Arc<MemoryStateStore>,
    }

    async fn harness(script: Vec<ScriptedReply>) -> Harness {
        let http = Arc::new(ScriptedHttp::new(script));
        let rpc = Arc::new(RpcClient::new(
            Arc::clone(&http) as Arc<dyn RpcHttp>,
            None,
            Arc::new(NullEvents),
        ));
        let store = Arc::new(MemoryStateStore::new());
        let engine = SyncEngine::new(
            rpc,
            Arc::clone(&store) as Arc<dyn StateStore>,
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryKv::default()),
            EngineOptions::default(),
        )
        .await
        .expect("engine construction");
        Harness {
            engine,
            http,
            store,
        }
    }

    #[tokio::test]
    async fn settings_fetch_teaches_the_transport_the_dialect() {
        let h = harness(vec![
            ScriptedReply::success(json!({
                "rpc-version": SNAKE_CASE_RPC_VERSION,
                "download-dir": "/srv/complete",
            })),
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({"rpc-version": SNAKE_CASE_RPC_VERSION})),
        ])
        .await;

        let settings = h.engine.update_settings().await.expect("settings");
        assert_eq!(settings.rpc_version, SNAKE_CASE_RPC_VERSION);
        assert_eq!(
            h.store.settings().await.expect("stored").download_dir,
            "/srv/complete"
        );

        // Subsequent mutations serialize in the learned dialect.
        h.engine
            .set_stalled_policy(true, 45)
            .await
            .expect("mutation");
        let bodies = h.http.bodies();
        assert!(bodies[1].contains("\"method\":\"session-set\""));
        assert!(bodies[1].contains("queue_stalled_minutes"));
        assert!(!bodies[1].contains("queue-stalled-minutes"));
    }

    #[tokio::test]
    async fn mutators_re_fetch_the_accepted_settings() {
        let h = harness(vec![
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({
                "speed-limit-down": 250,
                "speed-limit-down-enabled": true,
            })),
        ])
        .await;

        h.engine
            .set_speed_limits(Some(250), None)
            .await
            .expect("mutation");

        let bodies = h.http.bodies();
        assert!(bodies[0].contains("\"speed-limit-down\":250"));
        assert!(bodies[0].contains("\"speed-limit-up-enabled\":false"));
        assert!(bodies[1].contains("\"method\":\"session-get\""));
        let stored = h.store.settings().await.expect("stored");
        assert_eq!(stored.speed_limit_down, 250);
        assert!(stored.speed_limit_down_enabled);
    }

    #[tokio::test]
    async fn free_space_requires_a_usable_size() {
        let h = harness(vec![
            ScriptedReply::success(json!({"path": "/srv", "size-bytes": 1_234_567})),
            ScriptedReply::success(json!({"path": "/gone", "size-bytes": -1})),
        ])
        .await;

        assert_eq!(h.engine.free_space("/srv").await.expect("size"), 1_234_567);
        let err = h
            .engine
            .free_space("/gone")
            .await
            .expect_err("negative size is an error");
        assert!(matches!(err, SyncError::Wire { .. }));
    }

    #[tokio::test]
    async fn port_test_reads_the_open_flag() {
        let h = harness(vec![
            ScriptedReply::success(json!({"port-is-open": true})),
            ScriptedReply::success(json!({})),
        ])
        .await;
        assert!(h.engine.port_test().await.expect("open"));
        assert!(!h.engine.port_test().await.expect("absent defaults closed"));
    }

    #[tokio::test]
    async fn blocklist_update_reports_the_new_size_and_refreshes() {
        let h = harness(vec![
            ScriptedReply::success(json!({"blocklist-size": 50_000})),
            ScriptedReply::success(json!({"blocklist-size": 50_000, "blocklist-enabled": true})),
        ])
        .await;

        let size = h.engine.blocklist_update().await.expect("update");
        assert_eq!(size, 50_000);
        let stored = h.store.settings().await.expect("stored");
        assert_eq!(stored.blocklist_size, 50_000);
    }
}
