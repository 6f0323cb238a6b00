//! File-backed [`KeyValueStore`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use testops_core::error::{Result, TestOpsError};
use testops_core::storage::KeyValueStore;

use crate::storage::{AtomicJsonError, AtomicJsonFile};

type Entries = BTreeMap<String, String>;

/// All keys live in one JSON object file (`client_state.json`).
///
/// File I/O runs on the blocking pool. A corrupt file reads as empty and is
/// replaced by the next write.
#[derive(Clone)]
pub struct FileKeyValueStore {
    file: Arc<AtomicJsonFile<Entries>>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    async fn blocking<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&AtomicJsonFile<Entries>) -> std::result::Result<R, AtomicJsonError>
            + Send
            + 'static,
        R: Send + 'static,
    {
        let file = self.file.clone();
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| TestOpsError::internal(format!("Failed to join task: {}", e)))?
            .map_err(TestOpsError::from)
    }
}

fn load_lenient(file: &AtomicJsonFile<Entries>) -> std::result::Result<Entries, AtomicJsonError> {
    match file.load() {
        Ok(entries) => Ok(entries.unwrap_or_default()),
        Err(AtomicJsonError::JsonError(e)) => {
            tracing::warn!(
                "[Storage] Ignoring corrupt state file {}: {}",
                file.path().display(),
                e
            );
            Ok(Entries::new())
        }
        Err(e) => Err(e),
    }
}

fn write_entry(
    file: &AtomicJsonFile<Entries>,
    key: String,
    value: Option<String>,
) -> std::result::Result<(), AtomicJsonError> {
    let apply = |entries: &mut Entries| {
        match &value {
            Some(value) => entries.insert(key.clone(), value.clone()),
            None => entries.remove(&key),
        };
        Ok(())
    };

    match file.update(Entries::new(), apply) {
        Err(AtomicJsonError::JsonError(_)) => {
            let mut entries = Entries::new();
            if let Some(value) = value.clone() {
                entries.insert(key.clone(), value);
            }
            file.save(&entries)
        }
        other => other,
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |file| Ok(load_lenient(file)?.remove(&key)))
            .await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        tracing::debug!("[Storage] set {}", key);
        let key = key.to_string();
        self.blocking(move |file| write_entry(file, key, Some(value)))
            .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        tracing::debug!("[Storage] remove {}", key);
        let key = key.to_string();
        self.blocking(move |file| write_entry(file, key, None)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use testops_core::storage::keys;

    #[tokio::test]
    async fn test_round_trip_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client_state.json");

        let store = FileKeyValueStore::new(path.clone());
        store.set(keys::AUTH_TOKEN, "\"t1\"".into()).await.unwrap();
        store.set(keys::THEME, "\"dark\"".into()).await.unwrap();

        let reopened = FileKeyValueStore::new(path);
        assert_eq!(
            reopened.get(keys::AUTH_TOKEN).await.unwrap().as_deref(),
            Some("\"t1\"")
        );

        reopened.remove(keys::AUTH_TOKEN).await.unwrap();
        assert!(store.get(keys::AUTH_TOKEN).await.unwrap().is_none());
        assert!(store.get(keys::THEME).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty_and_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("client_state.json");
        std::fs::write(&path, "{ broken").unwrap();

        let store = FileKeyValueStore::new(path);
        assert!(store.get(keys::THEME).await.unwrap().is_none());

        store.set(keys::THEME, "\"light\"".into()).await.unwrap();
        assert_eq!(
            store.get(keys::THEME).await.unwrap().as_deref(),
            Some("\"light\"")
        );
    }
}
