//! Startup wiring for one CLI invocation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use testops_application::{Bootstrap, CopilotUseCase};
use testops_core::storage::{InMemoryKeyValueStore, KeyValueStore};
use testops_infrastructure::{AppConfig, FileKeyValueStore, SecretStorage, TestOpsPaths};
use testops_interaction::{DataSource, HttpTransport, OfflineTransport, ReqwestTransport};
use tracing::debug;

pub struct Options {
    pub config_dir: Option<PathBuf>,
    pub offline: bool,
    pub ephemeral: bool,
}

impl Options {
    pub fn paths(&self) -> TestOpsPaths {
        TestOpsPaths::new(self.config_dir.clone())
    }
}

pub fn load_config(paths: &TestOpsPaths) -> Result<(PathBuf, AppConfig)> {
    let path = paths.config_file()?;
    let config = AppConfig::load_with_env(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok((path, config))
}

pub async fn build(options: &Options) -> Result<CopilotUseCase> {
    let paths = options.paths();
    let (config_path, config) = load_config(&paths)?;
    debug!(
        "[CLI] Config {} (offline: {}, ephemeral: {})",
        config_path.display(),
        options.offline,
        options.ephemeral
    );
    let secrets = SecretStorage::new(&paths)?
        .load_or_default()
        .context("Failed to load secrets")?;

    let storage: Arc<dyn KeyValueStore> = if options.ephemeral {
        Arc::new(InMemoryKeyValueStore::new())
    } else {
        Arc::new(FileKeyValueStore::new(paths.client_state_file()?))
    };

    let (transport, data_source): (Arc<dyn HttpTransport>, DataSource) = if options.offline {
        (Arc::new(OfflineTransport), DataSource::Fixed)
    } else {
        (
            Arc::new(ReqwestTransport::new().context("Failed to create HTTP client")?),
            DataSource::Remote,
        )
    };

    Ok(Bootstrap::new(config, transport, storage)
        .with_secrets(secrets)
        .with_data_source(data_source)
        .build()
        .await)
}
