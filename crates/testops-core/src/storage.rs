//! Client-side key/value persistence.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, TestOpsError};

/// Keys of the persisted client state. Values are JSON documents.
pub mod keys {
    pub const AUTH_TOKEN: &str = "testops_token";
    pub const THEME: &str = "testops_theme";
    pub const PREFERENCES: &str = "testops_preferences";
    pub const RECENT_PROJECTS: &str = "testops_recent_projects";
    pub const CODE_TEMPLATES: &str = "testops_code_templates";
    pub const MODEL_API_KEY: &str = "cloudru_api_key";

    pub const ALL: [&str; 6] = [
        AUTH_TOKEN,
        THEME,
        PREFERENCES,
        RECENT_PROJECTS,
        CODE_TEMPLATES,
        MODEL_API_KEY,
    ];
}

/// String-keyed store of raw JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes a key. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Process-local store, used by tests and the `--ephemeral` CLI mode.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| TestOpsError::internal("key/value store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.lock()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
