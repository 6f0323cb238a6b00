//! Typed access to the persisted client state.
//!
//! Every key has a documented default; a missing entry or one that fails to
//! decode yields the default and never an error.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use testops_core::error::Result;
use testops_core::preferences::{
    CodeTemplates, Preferences, RecentProject, Theme, default_code_templates, remember_project,
};
use testops_core::storage::{KeyValueStore, keys};

#[derive(Clone)]
pub struct PersistedState {
    store: Arc<dyn KeyValueStore>,
}

impl PersistedState {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("[Storage] Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("[Storage] Ignoring corrupt entry {}: {}", key, e);
                None
            }
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    /// Bearer credential. Default: none.
    pub async fn token(&self) -> Option<String> {
        self.read::<String>(keys::AUTH_TOKEN)
            .await
            .filter(|token| !token.is_empty())
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.write(keys::AUTH_TOKEN, &token).await
    }

    pub async fn clear_token(&self) -> Result<()> {
        self.store.remove(keys::AUTH_TOKEN).await
    }

    /// Default: light.
    pub async fn theme(&self) -> Theme {
        self.read(keys::THEME).await.unwrap_or_default()
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        self.write(keys::THEME, &theme).await
    }

    /// Default: [`Preferences::default`].
    pub async fn preferences(&self) -> Preferences {
        self.read(keys::PREFERENCES).await.unwrap_or_default()
    }

    pub async fn set_preferences(&self, preferences: &Preferences) -> Result<()> {
        self.write(keys::PREFERENCES, preferences).await
    }

    /// Default: empty.
    pub async fn recent_projects(&self) -> Vec<RecentProject> {
        self.read(keys::RECENT_PROJECTS).await.unwrap_or_default()
    }

    pub async fn remember_project(&self, project: RecentProject) -> Result<Vec<RecentProject>> {
        let mut projects = self.recent_projects().await;
        remember_project(&mut projects, project);
        self.write(keys::RECENT_PROJECTS, &projects).await?;
        Ok(projects)
    }

    /// Default: the built-in UI and API templates.
    pub async fn code_templates(&self) -> CodeTemplates {
        self.read(keys::CODE_TEMPLATES)
            .await
            .unwrap_or_else(default_code_templates)
    }

    pub async fn set_code_templates(&self, templates: &CodeTemplates) -> Result<()> {
        self.write(keys::CODE_TEMPLATES, templates).await
    }

    /// Model provider key. Default: none.
    pub async fn model_api_key(&self) -> Option<String> {
        self.read::<String>(keys::MODEL_API_KEY)
            .await
            .filter(|key| !key.is_empty())
    }

    pub async fn set_model_api_key(&self, api_key: &str) -> Result<()> {
        self.write(keys::MODEL_API_KEY, &api_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testops_core::preferences::ThemePreference;
    use testops_core::storage::InMemoryKeyValueStore;

    fn state() -> (Arc<InMemoryKeyValueStore>, PersistedState) {
        let store = Arc::new(InMemoryKeyValueStore::new());
        (store.clone(), PersistedState::new(store))
    }

    #[tokio::test]
    async fn test_defaults_when_missing() {
        let (_, state) = state();
        assert!(state.token().await.is_none());
        assert_eq!(state.theme().await, Theme::Light);
        assert_eq!(state.preferences().await, Preferences::default());
        assert!(state.recent_projects().await.is_empty());
        assert!(state.code_templates().await.contains_key("ui-test-basic"));
        assert!(state.model_api_key().await.is_none());
    }

    #[tokio::test]
    async fn test_defaults_when_corrupt() {
        let (store, state) = state();
        for key in keys::ALL {
            store.set(key, "{not json".into()).await.unwrap();
        }
        assert!(state.token().await.is_none());
        assert_eq!(state.theme().await, Theme::Light);
        assert_eq!(state.preferences().await, Preferences::default());
        assert!(state.recent_projects().await.is_empty());
        assert_eq!(state.code_templates().await, default_code_templates());
    }

    #[tokio::test]
    async fn test_every_key_round_trips() {
        let (_, state) = state();

        state.set_token("t1").await.unwrap();
        assert_eq!(state.token().await.as_deref(), Some("t1"));
        state.clear_token().await.unwrap();
        assert!(state.token().await.is_none());

        state.set_theme(Theme::Dark).await.unwrap();
        assert_eq!(state.theme().await, Theme::Dark);

        let prefs = Preferences {
            theme: ThemePreference::Dark,
            language: "en".into(),
            notifications: false,
            auto_save: false,
        };
        state.set_preferences(&prefs).await.unwrap();
        assert_eq!(state.preferences().await, prefs);

        let project = RecentProject {
            id: "12345".into(),
            name: "testops-tests".into(),
            last_accessed: "2024-01-20".into(),
        };
        state.remember_project(project.clone()).await.unwrap();
        assert_eq!(state.recent_projects().await, vec![project]);

        let mut templates = CodeTemplates::new();
        templates.insert("mine".into(), "import allure".into());
        state.set_code_templates(&templates).await.unwrap();
        assert_eq!(state.code_templates().await, templates);

        state.set_model_api_key("sk-1").await.unwrap();
        assert_eq!(state.model_api_key().await.as_deref(), Some("sk-1"));
    }
}
