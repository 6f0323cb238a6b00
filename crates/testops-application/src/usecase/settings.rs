use std::collections::BTreeMap;

use testops_core::notification::Notification;
use testops_core::preferences::{Preferences, RecentProject, Theme};
use tracing::error;

use super::{CopilotUseCase, now};
use crate::store::{Action, IntegrationsAction, UiAction, View};

impl CopilotUseCase {
    /// Flips the theme and persists the result.
    pub async fn toggle_theme(&self) -> Theme {
        self.store.dispatch(Action::Ui(UiAction::ToggleTheme));
        let theme = self.store.select(|state| state.ui.theme);
        self.save_theme(theme).await;
        theme
    }

    /// Saves preferences. A `system` theme is resolved here so the ui slice
    /// only ever holds light or dark.
    pub async fn save_preferences(&self, preferences: &Preferences, system_prefers_dark: bool) {
        if let Err(e) = self.persisted.set_preferences(preferences).await {
            error!("[Settings] Failed to persist preferences: {}", e);
            self.notify(Notification::error("Could not save preferences"));
            return;
        }
        let theme = preferences.theme.resolve(system_prefers_dark);
        self.store.dispatch(Action::Ui(UiAction::SetTheme(theme)));
        self.save_theme(theme).await;
    }

    async fn save_theme(&self, theme: Theme) {
        if let Err(e) = self.persisted.set_theme(theme).await {
            error!("[Settings] Failed to persist theme: {}", e);
        }
    }

    pub async fn remember_project(&self, id: &str, name: &str) -> Vec<RecentProject> {
        let project = RecentProject {
            id: id.to_string(),
            name: name.to_string(),
            last_accessed: now(),
        };
        match self.persisted.remember_project(project).await {
            Ok(projects) => projects,
            Err(e) => {
                error!("[Settings] Failed to persist recent projects: {}", e);
                self.persisted.recent_projects().await
            }
        }
    }

    pub fn toggle_sidebar(&self) {
        self.store.dispatch(Action::Ui(UiAction::ToggleSidebar));
    }

    pub fn set_global_loading(&self, loading: bool) {
        self.store.dispatch(Action::Ui(UiAction::SetGlobalLoading(loading)));
    }

    pub fn navigate(&self, view: View) {
        self.store.dispatch(Action::Ui(UiAction::Navigate(view)));
    }

    pub fn connect_integration(&self, id: &str, settings: BTreeMap<String, String>) {
        self.store.dispatch(Action::Integrations(IntegrationsAction::Connected {
            id: id.to_string(),
            settings,
            now: now(),
        }));
    }

    pub fn disconnect_integration(&self, id: &str) {
        self.store
            .dispatch(Action::Integrations(IntegrationsAction::Disconnected(id.to_string())));
    }

    /// Records a sync. False when the integration is not connected.
    pub fn sync_integration(&self, id: &str) -> bool {
        self.store.dispatch(Action::Integrations(IntegrationsAction::Synced {
            id: id.to_string(),
            now: now(),
        }));
        self.store.select(|state| {
            state
                .integrations
                .get(id)
                .is_some_and(|integration| integration.connected())
        })
    }
}
