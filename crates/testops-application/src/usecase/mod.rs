//! Store operations.
//!
//! Each operation threads the pending/fulfilled/rejected lifecycle through
//! the store around one service call. Read paths never fail; write-path
//! failures are returned to the caller and posted as an error notification.

mod auth;
mod coverage;
mod generation;
mod gitlab;
mod model;
mod plans;
mod settings;
mod standards;

pub use gitlab::GITLAB_INTEGRATION_ID;
pub use model::MODEL_INTEGRATION_ID;

use std::sync::Arc;

use testops_core::error::ApiError;
use testops_core::notification::Notification;
use testops_infrastructure::PersistedState;
use testops_interaction::Services;
use testops_interaction::services::{GitLabClient, ModelService};
use tokio::sync::RwLock;
use tracing::warn;

use crate::store::{Action, AppState, Store, UiAction};

/// Use case driving every user-facing operation of the copilot.
///
/// `CopilotUseCase` owns the service bundle and shares the store with the
/// gateway's session hooks. All methods take `&self`; overlapping calls are
/// ordered by the store's commit policy.
pub struct CopilotUseCase {
    store: Arc<Store>,
    services: Services,
    persisted: PersistedState,
    /// Replaced when a new model key is saved.
    model: RwLock<ModelService>,
    /// Set once GitLab has been configured.
    gitlab: RwLock<Option<GitLabClient>>,
}

impl CopilotUseCase {
    /// Creates a use case over an already wired store and service bundle.
    ///
    /// # Arguments
    ///
    /// * `store` - Store shared with the session guard
    /// * `services` - Domain services sharing one gateway
    /// * `persisted` - Client-side persistence
    pub fn new(store: Arc<Store>, services: Services, persisted: PersistedState) -> Self {
        let model = RwLock::new(services.model.clone());
        Self {
            store,
            services,
            persisted,
            model,
            gitlab: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn state(&self) -> AppState {
        self.store.snapshot()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn persisted(&self) -> &PersistedState {
        &self.persisted
    }

    pub fn notify(&self, notification: Notification) {
        self.store.dispatch(Action::Ui(UiAction::Notify(notification)));
    }

    pub fn dismiss(&self, notification_id: &str) {
        self.store
            .dispatch(Action::Ui(UiAction::Dismiss(notification_id.to_string())));
    }

    /// Surfaces a write-path failure as an error banner.
    fn report(&self, context: &str, err: &ApiError) {
        warn!("[UseCase] {} failed: {}", context, err);
        self.notify(Notification::error(err.message.clone()));
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
