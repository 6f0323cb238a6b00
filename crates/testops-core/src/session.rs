//! Authenticated principal and login contracts.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Result, TestOpsError};

/// Role of a logged-in user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    Qa,
    Developer,
    Viewer,
}

/// User profile as returned by `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// The logged-in principal: identity plus opaque bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: User,
    pub token: String,
}

impl Session {
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }
}

/// Credentials submitted by the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks that both fields are present. Runs before any call is made.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() {
            return Err(TestOpsError::validation("email", "Email is required"));
        }
        if self.password.is_empty() {
            return Err(TestOpsError::validation("password", "Password is required"));
        }
        Ok(())
    }
}

/// Wire payload of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

impl From<LoginResponse> for Session {
    fn from(response: LoginResponse) -> Self {
        Session::new(response.user, response.token)
    }
}
