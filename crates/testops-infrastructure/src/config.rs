//! Application configuration (`config.toml` plus environment overrides).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use testops_core::dispatch::CommitPolicy;
use testops_core::error::{Result, TestOpsError};
use testops_core::notification::DEFAULT_NOTIFICATION_CAP;

pub const ENV_API_BASE_URL: &str = "TESTOPS_API_BASE_URL";
pub const ENV_MODEL_BASE_URL: &str = "TESTOPS_MODEL_BASE_URL";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "TESTOPS_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Backend base URL.
    pub api_base_url: String,
    /// AI-model provider base URL.
    pub model_base_url: String,
    /// Hosts ending with this domain get the provider client headers.
    pub model_provider_domain: String,
    pub request_timeout_secs: u64,
    pub notification_cap: usize,
    pub commit_policy: CommitPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            model_base_url: "https://api.cloud.ru/evolution/v1".to_string(),
            model_provider_domain: "cloud.ru".to_string(),
            request_timeout_secs: 30,
            notification_cap: DEFAULT_NOTIFICATION_CAP,
            commit_policy: CommitPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the file then applies process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies overrides from `lookup`. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_API_BASE_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = non_empty(ENV_MODEL_BASE_URL) {
            self.model_base_url = url;
        }
        if let Some(secs) = non_empty(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = secs.trim().parse().map_err(|_| {
                TestOpsError::config(format!(
                    "{ENV_REQUEST_TIMEOUT_SECS} must be a number of seconds, got {secs:?}"
                ))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(TestOpsError::config("request_timeout_secs must be positive"));
        }
        if self.notification_cap == 0 {
            return Err(TestOpsError::config("notification_cap must be positive"));
        }
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("model_base_url", &self.model_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(TestOpsError::config(format!(
                    "{name} must be an http(s) URL, got {url:?}"
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.notification_cap, 5);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"https://testops.example/api\"\ncommit_policy = \"last_dispatched_wins\"\n",
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.api_base_url, "https://testops.example/api");
        assert_eq!(config.commit_policy, CommitPolicy::LastDispatchedWins);
        assert_eq!(config.model_provider_domain, "cloud.ru");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_BASE_URL, "https://backend.local/api"),
            (ENV_MODEL_BASE_URL, ""),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "https://backend.local/api");
        assert_eq!(config.model_base_url, AppConfig::default().model_base_url);
        assert_eq!(config.request_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(|name| (name == ENV_REQUEST_TIMEOUT_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, TestOpsError::Config(_)));

        let config = AppConfig {
            api_base_url: "localhost:8000".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let back: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
