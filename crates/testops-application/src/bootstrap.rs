//! Wires configuration, persistence, gateway and services into a use case.

use std::sync::Arc;

use testops_core::storage::KeyValueStore;
use testops_infrastructure::{AppConfig, PersistedState, SecretConfig};
use testops_interaction::{ApiGateway, DataSource, HttpTransport, Services, SourceResolver};
use tracing::{info, warn};

use crate::session_guard::SessionGuard;
use crate::store::{AppState, Store};
use crate::usecase::CopilotUseCase;

/// Everything needed to start the application.
pub struct Bootstrap {
    pub config: AppConfig,
    pub secrets: SecretConfig,
    pub transport: Arc<dyn HttpTransport>,
    pub storage: Arc<dyn KeyValueStore>,
    pub data_source: DataSource,
}

impl Bootstrap {
    pub fn new(
        config: AppConfig,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            secrets: SecretConfig::default(),
            transport,
            storage,
            data_source: DataSource::default(),
        }
    }

    pub fn with_secrets(mut self, secrets: SecretConfig) -> Self {
        self.secrets = secrets;
        self
    }

    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    /// Seeds the store from persisted state and builds the use case.
    pub async fn build(self) -> CopilotUseCase {
        let Bootstrap {
            config,
            secrets,
            transport,
            storage,
            data_source,
        } = self;

        let persisted = PersistedState::new(storage);
        let token = persisted.token().await;
        let theme = persisted.theme().await;
        info!(
            "[Bootstrap] Starting against {} ({} data, session {})",
            config.api_base_url,
            data_source,
            if token.is_some() { "restored" } else { "none" }
        );

        let state = AppState::seeded(token, theme, config.notification_cap);
        let store = Arc::new(Store::new(state, config.commit_policy));
        let guard = Arc::new(SessionGuard::new(store.clone(), persisted.clone()));

        let gateway = ApiGateway::new(config.api_base_url.clone(), transport)
            .with_timeout(config.request_timeout())
            .with_provider_domain(config.model_provider_domain.clone())
            .with_token_source(guard.clone())
            .with_unauthorized_handler(guard);

        let model_base_url = secrets
            .model
            .as_ref()
            .and_then(|model| model.base_url.clone())
            .unwrap_or_else(|| config.model_base_url.clone());
        let model_api_key = match secrets.model_api_key() {
            Some(key) => Some(key.to_string()),
            None => persisted.model_api_key().await,
        };

        let services = Services::new(
            gateway,
            SourceResolver::new(data_source),
            model_base_url,
            model_api_key,
        );
        let usecase = CopilotUseCase::new(store, services, persisted);

        if let Some(gitlab) = secrets.gitlab {
            if let Err(err) = usecase.configure_gitlab(gitlab.into()).await {
                warn!("[Bootstrap] Ignoring GitLab secret: {}", err);
            }
        }
        usecase
    }
}
