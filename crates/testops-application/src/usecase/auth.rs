use testops_core::error::ApiError;
use testops_core::notification::Notification;
use testops_core::session::{Credentials, Session};
use tracing::{error, info};

use super::CopilotUseCase;
use crate::store::{Action, AuthAction, Field};

impl CopilotUseCase {
    /// Logs in, persists the bearer credential and opens the dashboard.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let ticket = self.store.begin(Field::Session);
        match self.services.auth.login(credentials).await {
            Ok(session) => {
                if let Err(e) = self.persisted.set_token(&session.token).await {
                    error!("[Auth] Failed to persist token: {}", e);
                }
                self.store.settle(
                    ticket,
                    Action::Auth(AuthAction::LoginFulfilled(session.clone())),
                );
                info!("[Auth] Logged in as {}", session.user.email);
                self.notify(Notification::success(format!(
                    "Welcome, {}!",
                    session.user.name
                )));
                Ok(session)
            }
            Err(err) => {
                self.store.settle(
                    ticket,
                    Action::Auth(AuthAction::LoginRejected(err.message.clone())),
                );
                self.report("login", &err);
                Err(err)
            }
        }
    }

    /// Ends the session locally whatever the backend answers.
    pub async fn logout(&self) {
        self.services.auth.logout().await;
        self.store.dispatch(Action::Auth(AuthAction::LoggedOut));
        if let Err(e) = self.persisted.clear_token().await {
            error!("[Auth] Failed to clear persisted token: {}", e);
        }
        info!("[Auth] Logged out");
    }
}
