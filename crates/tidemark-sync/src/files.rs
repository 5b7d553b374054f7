//! File listing and per-file priority updates.

use futures_util::future::join_all;
use serde_json::{Map, Value, json};
use tidemark_core::{FilePriority, TorrentFile};
use tracing::debug;

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::normalize;

/// Maximum file indexes per priority request. Large torrents are split into
/// chunks of this size and the chunks are issued concurrently.
const PRIORITY_CHUNK: usize = 250;

impl SyncEngine {
    /// Fetch the file list of one torrent.
    ///
    /// # Errors
    ///
    /// Propagates transport failures; [`SyncError::Wire`] when the daemon
    /// does not return the torrent.
    pub async fn torrent_files(&self, id: i64) -> SyncResult<Vec<TorrentFile>> {
        let mut arguments = Map::new();
        arguments.insert("ids".to_string(), json!([id]));
        arguments.insert("fields".to_string(), json!(["id", "files", "fileStats"]));
        let response = self.rpc.call("torrent-get", arguments).await?;
        let record = normalize::get_array(&response, "torrents")
            .first()
            .and_then(Value::as_object)
            .ok_or_else(|| SyncError::wire(format!("torrent {id} absent from files response")))?;
        Ok(normalize::files(
            normalize::get_array(record, "files"),
            normalize::get_array(record, "fileStats"),
        ))
    }

    /// Apply one priority level to the given file indexes of one torrent.
    ///
    /// Indexes are split into chunks of [`PRIORITY_CHUNK`] and the chunk
    /// requests run concurrently; every chunk is awaited even when an early
    /// one fails, and the first failure propagates.
    ///
    /// # Errors
    ///
    /// Propagates the first transport failure among the chunk requests.
    pub async fn set_file_priority(
        &self,
        id: i64,
        priority: FilePriority,
        indexes: &[u32],
    ) -> SyncResult<()> {
        if indexes.is_empty() {
            return Ok(());
        }
        debug!(
            id,
            files = indexes.len(),
            chunks = indexes.len().div_ceil(PRIORITY_CHUNK),
            "updating file priorities"
        );

        let calls = indexes.chunks(PRIORITY_CHUNK).map(|chunk| {
            let mut arguments = Map::new();
            arguments.insert("ids".to_string(), json!([id]));
            match priority {
                FilePriority::Excluded => {
                    arguments.insert("files-unwanted".to_string(), json!(chunk));
                }
                FilePriority::Low => {
                    arguments.insert("files-wanted".to_string(), json!(chunk));
                    arguments.insert("priority-low".to_string(), json!(chunk));
                }
                FilePriority::Normal => {
                    arguments.insert("files-wanted".to_string(), json!(chunk));
                    arguments.insert("priority-normal".to_string(), json!(chunk));
                }
                FilePriority::High => {
                    arguments.insert("files-wanted".to_string(), json!(chunk));
                    arguments.insert("priority-high".to_string(), json!(chunk));
                }
            }
            self.rpc.call("torrent-set", arguments)
        });

        let results = join_all(calls).await;
        for result in results {
            result?;
        }
        self.refresh_torrents(true).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tidemark_rpc::{NullEvents, RpcClient, RpcHttp};
    use tidemark_store::MemoryStateStore;
    use tidemark_test_support::{MemoryKv, RecordingNotifier, ScriptedHttp, ScriptedReply};

    use super::*;
    use crate::engine::EngineOptions;

    async fn engine_over(http: Arc<ScriptedHttp>) -> SyncEngine {
        let rpc = Arc::new(RpcClient::new(
            Arc::clone(&http) as Arc<dyn RpcHttp>,
            None,
            Arc::new(NullEvents),
        ));
        SyncEngine::new(
            rpc,
            Arc::new(MemoryStateStore::new()),
            Arc::new(RecordingNotifier::default()),
            Arc::new(MemoryKv::default()),
            EngineOptions::default(),
        )
        .await
        .expect("engine construction")
    }

    #[tokio::test]
    async fn large_selections_are_chunked_without_loss() {
        // 3 chunk requests plus the chained refresh.
        let http = Arc::new(ScriptedHttp::new(vec![
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({"torrents": []})),
        ]));
        let engine = engine_over(Arc::clone(&http)).await;
        let indexes: Vec<u32> = (0..600).collect();

        engine
            .set_file_priority(3, FilePriority::High, &indexes)
            .await
            .expect("priority update");

        let bodies = http.bodies();
        assert_eq!(bodies.len(), 4);
        let mut seen = 0;
        for body in &bodies[..3] {
            assert!(body.contains("\"method\":\"torrent-set\""));
            assert!(body.contains("files-wanted"));
            assert!(body.contains("priority-high"));
            let parsed: serde_json::Value = serde_json::from_str(body).expect("body json");
            seen += parsed["arguments"]["files-wanted"]
                .as_array()
                .expect("index array")
                .len();
        }
        assert_eq!(seen, 600);
        assert!(bodies[3].contains("\"method\":\"torrent-get\""));
    }

    #[tokio::test]
    async fn excluding_files_uses_the_unwanted_key() {
        let http = Arc::new(ScriptedHttp::new(vec![
            ScriptedReply::success(json!({})),
            ScriptedReply::success(json!({"torrents": []})),
        ]));
        let engine = engine_over(Arc::clone(&http)).await;

        engine
            .set_file_priority(1, FilePriority::Excluded, &[0, 1, 2])
            .await
            .expect("exclude");

        let body = &http.bodies()[0];
        assert!(body.contains("files-unwanted"));
        assert!(!body.contains("priority-"));
    }

    #[tokio::test]
    async fn empty_selection_is_a_no_op() {
        let http = Arc::new(ScriptedHttp::new(vec![]));
        let engine = engine_over(Arc::clone(&http)).await;
        engine
            .set_file_priority(1, FilePriority::Normal, &[])
            .await
            .expect("no-op");
        assert!(http.attempts().is_empty());
    }

    #[tokio::test]
    async fn file_list_is_normalized_from_parallel_arrays() {
        let http = Arc::new(ScriptedHttp::new(vec![ScriptedReply::success(json!({
            "torrents": [{
                "id": 2,
                "files": [
                    {"name": "pack/a.bin", "length": 100, "bytesCompleted": 100},
                    {"name": "pack/b.bin", "length": 200, "bytesCompleted": 0},
                ],
                "fileStats": [
                    {"wanted": true, "priority": 0},
                    {"wanted": false, "priority": 0},
                ],
            }],
        }))]));
        let engine = engine_over(Arc::clone(&http)).await;

        let files = engine.torrent_files(2).await.expect("files");
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].display_name, "a.bin");
        assert_eq!(files[0].priority, FilePriority::Normal);
        assert_eq!(files[1].priority, FilePriority::Excluded);
    }
}
