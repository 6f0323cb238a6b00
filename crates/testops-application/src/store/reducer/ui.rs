use super::super::action::UiAction;
use super::super::state::UiState;

pub fn reduce(ui: &mut UiState, action: UiAction) {
    match action {
        UiAction::Notify(notification) => {
            ui.notifications.push_back(notification);
            while ui.notifications.len() > ui.notification_cap {
                ui.notifications.pop_front();
            }
        }
        UiAction::Dismiss(id) => {
            ui.notifications.retain(|n| n.id != id);
        }
        UiAction::ClearNotifications => ui.notifications.clear(),
        UiAction::ToggleTheme => ui.theme = ui.theme.toggled(),
        UiAction::SetTheme(theme) => ui.theme = theme,
        UiAction::ToggleSidebar => ui.sidebar_open = !ui.sidebar_open,
        UiAction::SetGlobalLoading(loading) => ui.global_loading = loading,
        UiAction::Navigate(view) => ui.current_view = view,
    }
}
