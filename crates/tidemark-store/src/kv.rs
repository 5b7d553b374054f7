//! JSON-file implementation of the durable key-value contract.
//!
//! The whole map lives in one file; writes rewrite the file through a
//! temporary sibling and rename so a crash never leaves a torn map behind.

use std::path::PathBuf;

use anyhow::Context as _;
use async_trait::async_trait;
use serde_json::{Map, Value};
use tidemark_core::KeyValueStore;
use tokio::sync::Mutex;

/// File-backed durable map for the handful of values that must survive
/// process restarts.
pub struct JsonFileKv {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileKv {
    /// Bind to a map file; the file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    async fn load(&self) -> anyhow::Result<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt state file {}", self.path.display())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(err) => {
                Err(err).with_context(|| format!("reading state file {}", self.path.display()))
            }
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let _held = self.guard.lock().await;
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let _held = self.guard.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        let serialized = serde_json::to_vec_pretty(&Value::Object(map))?;

        let temp = self.path.with_extension("tmp");
        tokio::fs::write(&temp, &serialized)
            .await
            .with_context(|| format!("writing state file {}", temp.display()))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .with_context(|| format!("replacing state file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn absent_keys_are_distinct_from_empty_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let kv = JsonFileKv::new(dir.path().join("state.json"));

        assert_eq!(kv.get("notified").await.expect("get"), None);
        kv.set("notified", json!([])).await.expect("set");
        assert_eq!(kv.get("notified").await.expect("get"), Some(json!([])));
    }

    #[tokio::test]
    async fn values_survive_reopening_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        {
            let kv = JsonFileKv::new(&path);
            kv.set("notified", json!([1, 2, 3])).await.expect("set");
        }
        let reopened = JsonFileKv::new(&path);
        assert_eq!(
            reopened.get("notified").await.expect("get"),
            Some(json!([1, 2, 3]))
        );
    }
}
