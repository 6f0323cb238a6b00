//! Unified path management for TestOps Copilot files.
//!
//! ```text
//! ~/.config/testops/           # Config directory
//! ├── config.toml              # Application configuration
//! ├── secret.json              # Model provider key, GitLab token
//! └── client_state.json        # Persisted client key/value state
//! ```

use std::path::PathBuf;

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

const APP_DIR: &str = "testops";

/// Path resolution rooted at the platform config directory, or at an
/// explicit base directory (tests, `--config-dir`).
#[derive(Debug, Clone, Default)]
pub struct TestOpsPaths {
    base: Option<PathBuf>,
}

impl TestOpsPaths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    /// Returns the configuration directory (e.g. `~/.config/testops/`).
    pub fn config_dir(&self) -> Result<PathBuf, PathError> {
        match &self.base {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or(PathError::HomeDirNotFound),
        }
    }

    pub fn config_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// Ensure this file has permissions 600.
    pub fn secret_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("secret.json"))
    }

    pub fn client_state_file(&self) -> Result<PathBuf, PathError> {
        Ok(self.config_dir()?.join("client_state.json"))
    }
}
