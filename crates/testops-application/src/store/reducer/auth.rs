use testops_core::notification::Notification;

use super::super::action::{AuthAction, UiAction};
use super::super::state::{AuthState, UiState, View};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again.";

pub fn reduce(auth: &mut AuthState, ui: &mut UiState, action: AuthAction) {
    match action {
        AuthAction::LoginFulfilled(session) => {
            auth.user = Some(session.user);
            auth.token = Some(session.token);
            auth.status.error = None;
            ui.current_view = View::Dashboard;
        }
        AuthAction::LoginRejected(message) => {
            auth.status.fail(message);
        }
        AuthAction::LoggedOut => {
            auth.clear();
            ui.current_view = View::Login;
        }
        AuthAction::SessionExpired => {
            auth.clear();
            ui.current_view = View::Login;
            super::ui::reduce(
                ui,
                UiAction::Notify(Notification::warning(SESSION_EXPIRED_MESSAGE)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testops_core::session::{Role, Session, User};

    fn session() -> Session {
        Session::new(
            User {
                id: "1".into(),
                name: "Demo".into(),
                email: "demo@cloud.ru".into(),
                role: Role::Qa,
                avatar: None,
            },
            "t1",
        )
    }

    #[test]
    fn test_login_then_logout() {
        let mut auth = AuthState::default();
        let mut ui = UiState::default();

        reduce(&mut auth, &mut ui, AuthAction::LoginFulfilled(session()));
        assert_eq!(auth.session(), Some(session()));
        assert_eq!(ui.current_view, View::Dashboard);

        reduce(&mut auth, &mut ui, AuthAction::LoggedOut);
        assert!(auth.user.is_none());
        assert!(auth.token.is_none());
        assert_eq!(ui.current_view, View::Login);
    }

    #[test]
    fn test_expiry_posts_banner_but_logout_does_not() {
        let mut auth = AuthState::default();
        let mut ui = UiState::default();

        reduce(&mut auth, &mut ui, AuthAction::LoginFulfilled(session()));
        reduce(&mut auth, &mut ui, AuthAction::LoggedOut);
        assert!(ui.notifications.is_empty());

        reduce(&mut auth, &mut ui, AuthAction::LoginFulfilled(session()));
        reduce(&mut auth, &mut ui, AuthAction::SessionExpired);
        assert!(!auth.is_authenticated());
        assert_eq!(ui.current_view, View::Login);
        assert_eq!(ui.notifications.len(), 1);
        assert_eq!(ui.notifications[0].message, SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn test_rejected_login_keeps_view() {
        let mut auth = AuthState::default();
        let mut ui = UiState::default();
        reduce(&mut auth, &mut ui, AuthAction::LoginRejected("Invalid credentials".into()));
        assert_eq!(auth.status.error.as_deref(), Some("Invalid credentials"));
        assert_eq!(ui.current_view, View::Login);
    }
}
