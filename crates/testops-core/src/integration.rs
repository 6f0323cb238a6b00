//! Third-party integration records.
//!
//! Status transitions go through methods so that `connected` and
//! [`IntegrationStatus::Connected`] never disagree.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationStatus {
    Connected,
    Disconnected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    connected: bool,
    status: IntegrationStatus,
    last_sync: Option<String>,
    pub config: BTreeMap<String, String>,
}

impl IntegrationConfig {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            connected: false,
            status: IntegrationStatus::Disconnected,
            last_sync: None,
            config: BTreeMap::new(),
        }
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> IntegrationStatus {
        self.status
    }

    pub fn last_sync(&self) -> Option<&str> {
        self.last_sync.as_deref()
    }

    /// Marks the integration connected, merging `settings` into its config.
    pub fn connect(&mut self, settings: BTreeMap<String, String>, now: &str) {
        self.config.extend(settings);
        self.connected = true;
        self.status = IntegrationStatus::Connected;
        self.last_sync = Some(now.to_string());
    }

    pub fn disconnect(&mut self) {
        self.connected = false;
        self.status = IntegrationStatus::Disconnected;
        self.last_sync = None;
    }

    /// Records a sync. Returns false when the integration is not connected.
    pub fn sync(&mut self, now: &str) -> bool {
        if !self.connected {
            return false;
        }
        self.last_sync = Some(now.to_string());
        true
    }

    /// A failed connection attempt or sync. `last_sync` is kept.
    pub fn mark_error(&mut self) {
        self.connected = false;
        self.status = IntegrationStatus::Error;
    }

    /// Config with secret-looking values masked for display.
    pub fn masked_config(&self) -> BTreeMap<String, String> {
        self.config
            .iter()
            .map(|(key, value)| {
                let lowered = key.to_ascii_lowercase();
                if lowered.contains("token") || lowered.contains("key") {
                    (key.clone(), "••••••••".to_string())
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

/// Integrations offered out of the box, all disconnected.
pub fn default_catalog() -> Vec<IntegrationConfig> {
    vec![
        IntegrationConfig::new(
            "gitlab",
            "GitLab",
            "Commit generated tests and run them in GitLab CI/CD",
        ),
        IntegrationConfig::new(
            "cloud-ru-api",
            "Cloud.ru Evolution API",
            "Cloud.ru Evolution Foundation Model for test generation",
        ),
        IntegrationConfig::new(
            "allure-testops",
            "Allure TestOps",
            "Export test cases and results to Allure TestOps",
        ),
        IntegrationConfig::new("jira", "Jira", "Sync test cases with Jira issues"),
        IntegrationConfig::new("slack", "Slack", "Test run notifications in Slack"),
    ]
}
