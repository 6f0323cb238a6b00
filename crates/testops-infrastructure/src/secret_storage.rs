//! Secret configuration file storage.
//!
//! Loads the model provider key and GitLab credentials from
//! ~/.config/testops/secret.json.

use crate::paths::TestOpsPaths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use testops_core::gitlab::GitLabConnection;

/// Errors that can occur during secret storage operations.
#[derive(Debug)]
pub enum SecretStorageError {
    /// Configuration file not found.
    NotFound(PathBuf),
    /// File I/O error.
    IoError(std::io::Error),
    /// JSON parsing error.
    ParseError(serde_json::Error),
    /// Config directory not found.
    ConfigDirNotFound,
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::NotFound(path) => {
                write!(f, "Secret file not found at: {}", path.display())
            }
            SecretStorageError::IoError(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::ParseError(e) => write!(f, "JSON parse error: {}", e),
            SecretStorageError::ConfigDirNotFound => {
                write!(f, "Could not determine home directory")
            }
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::IoError(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::ParseError(e)
    }
}

/// Model provider credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSecret {
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// GitLab credentials used to pre-configure the GitLab service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabSecret {
    pub url: String,
    pub token: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl From<GitLabSecret> for GitLabConnection {
    fn from(secret: GitLabSecret) -> Self {
        let connection = GitLabConnection::new(secret.url, secret.token, secret.project_id);
        match secret.branch {
            Some(branch) => connection.with_branch(branch),
            None => connection,
        }
    }
}

/// Contents of secret.json. Every section is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelSecret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gitlab: Option<GitLabSecret>,
}

impl SecretConfig {
    /// The model API key, if set and non-blank.
    pub fn model_api_key(&self) -> Option<&str> {
        self.model
            .as_ref()
            .map(|m| m.api_key.as_str())
            .filter(|key| !key.trim().is_empty())
    }
}

/// Read-only storage for secret.json.
///
/// The file is plaintext JSON and should have permissions 600.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Creates a SecretStorage at the default path (~/.config/testops/secret.json).
    pub fn new(paths: &TestOpsPaths) -> Result<Self, SecretStorageError> {
        let path = paths
            .secret_file()
            .map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    /// Creates a SecretStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Loads and parses the secret file.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    /// Like [`load`](Self::load), but a missing file yields an empty config.
    pub fn load_or_default(&self) -> Result<SecretConfig, SecretStorageError> {
        match self.load() {
            Err(SecretStorageError::NotFound(_)) => Ok(SecretConfig::default()),
            other => other,
        }
    }

    /// Returns the path to the secret file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
