//! User preferences and other client-persisted values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Maximum number of recent projects remembered.
pub const RECENT_PROJECTS_LIMIT: usize = 10;

/// Theme as held by the ui slice. Always concrete.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Theme as chosen by the user. `System` follows the platform setting.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemePreference {
    pub fn resolve(self, system_prefers_dark: bool) -> Theme {
        match self {
            Self::Light => Theme::Light,
            Self::Dark => Theme::Dark,
            Self::System if system_prefers_dark => Theme::Dark,
            Self::System => Theme::Light,
        }
    }
}

impl From<Theme> for ThemePreference {
    fn from(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self::Light,
            Theme::Dark => Self::Dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: ThemePreference,
    pub language: String,
    pub notifications: bool,
    pub auto_save: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemePreference::System,
            language: "ru".to_string(),
            notifications: true,
            auto_save: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentProject {
    pub id: String,
    pub name: String,
    pub last_accessed: String,
}

/// Moves `project` to the front, dropping an older entry with the same id and
/// anything past [`RECENT_PROJECTS_LIMIT`].
pub fn remember_project(projects: &mut Vec<RecentProject>, project: RecentProject) {
    projects.retain(|p| p.id != project.id);
    projects.insert(0, project);
    projects.truncate(RECENT_PROJECTS_LIMIT);
}

/// Named code templates, keyed by template id.
pub type CodeTemplates = BTreeMap<String, String>;

pub fn default_code_templates() -> CodeTemplates {
    let mut templates = CodeTemplates::new();
    templates.insert(
        "ui-test-basic".to_string(),
        r#"import allure
import pytest

@allure.feature("feature-name")
class TestBasicUI:
    @allure.title("Basic UI test")
    def test_basic_ui(self):
        with allure.step("Step 1"):
            assert True"#
            .to_string(),
    );
    templates.insert(
        "api-test-basic".to_string(),
        r#"import allure
import pytest
import requests

@allure.feature("api-feature")
class TestBasicAPI:
    @allure.title("Basic API test")
    def test_basic_api(self):
        response = requests.get("https://api.example.com")
        assert response.status_code == 200"#
            .to_string(),
    );
    templates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_round_trip() {
        let prefs = Preferences {
            theme: ThemePreference::Dark,
            language: "en".into(),
            notifications: false,
            auto_save: true,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        assert!(json.contains("\"autoSave\":true"));
        let back: Preferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn test_system_theme_resolves() {
        assert_eq!(ThemePreference::System.resolve(true), Theme::Dark);
        assert_eq!(ThemePreference::System.resolve(false), Theme::Light);
        assert_eq!(ThemePreference::Light.resolve(true), Theme::Light);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::Dark.toggled().toggled(), Theme::Dark);
    }

    #[test]
    fn test_remember_project_dedups_and_caps() {
        let mut projects = Vec::new();
        for i in 0..12 {
            remember_project(
                &mut projects,
                RecentProject {
                    id: format!("p{i}"),
                    name: format!("Project {i}"),
                    last_accessed: format!("2024-01-{:02}", i + 1),
                },
            );
        }
        assert_eq!(projects.len(), RECENT_PROJECTS_LIMIT);
        assert_eq!(projects[0].id, "p11");

        let again = projects[5].clone();
        remember_project(&mut projects, again.clone());
        assert_eq!(projects[0], again);
        assert_eq!(projects.len(), RECENT_PROJECTS_LIMIT);
    }
}
