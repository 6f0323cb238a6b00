//! Login and logout against the backend.

use testops_core::error::ApiError;
use testops_core::session::{Credentials, LoginResponse, Session};
use tracing::{info, warn};

use crate::gateway::{ApiCall, ApiGateway};

#[derive(Debug, Clone)]
pub struct AuthService {
    gateway: ApiGateway,
}

impl AuthService {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// Submits credentials. Missing fields fail before any call is made.
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        if let Err(err) = credentials.validate() {
            return Err(ApiError::validation(err.display_message()));
        }

        let call = ApiCall::post("/auth/login").without_session().json(credentials)?;
        let response: LoginResponse = self.gateway.request(call).await?;
        info!("[Auth] Logged in as {}", response.user.email);
        Ok(response.into())
    }

    /// Best effort: a failed logout call is logged and otherwise ignored.
    pub async fn logout(&self) {
        if let Err(err) = self.gateway.send(ApiCall::post("/auth/logout")).await {
            warn!("[Auth] Logout call failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use testops_core::error::ErrorCode;
    use testops_core::session::Role;

    fn service(transport: Arc<ScriptedTransport>) -> AuthService {
        AuthService::new(ApiGateway::new("http://localhost:8000/api", transport))
    }

    #[tokio::test]
    async fn test_login_returns_session() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/auth/login",
            Reply::envelope(json!({
                "token": "t1",
                "user": {"id": "1", "name": "Demo", "email": "demo@cloud.ru", "role": "qa"}
            })),
        ));
        let session = service(transport.clone())
            .login(&Credentials::new("demo@cloud.ru", "demo123"))
            .await
            .unwrap();

        assert_eq!(session.token, "t1");
        assert_eq!(session.user.role, Role::Qa);
        let sent = transport.last_request().unwrap();
        assert_eq!(
            sent.json_body().unwrap(),
            &json!({"email": "demo@cloud.ru", "password": "demo123"})
        );
    }

    #[tokio::test]
    async fn test_missing_field_fails_before_call() {
        let transport = Arc::new(ScriptedTransport::new());
        let err = service(transport.clone())
            .login(&Credentials::new("", "demo123"))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::Validation);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_logout_ignores_failure() {
        let transport = Arc::new(ScriptedTransport::failing());
        service(transport.clone()).logout().await;
        assert_eq!(transport.requests_to(Method::POST, "/auth/logout").len(), 1);
    }
}
