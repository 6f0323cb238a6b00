//! GitLab v4 contracts and repository scaffolding content.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};
use crate::generation::TestKind;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Auto-generated tests from TestOps Copilot";
pub const DEFAULT_AUTHOR_NAME: &str = "TestOps Copilot";
pub const DEFAULT_AUTHOR_EMAIL: &str = "testops@cloud.ru";

/// Connection details as entered by the user. Optional fields take the
/// defaults above when a handle is configured.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitLabConnection {
    pub url: String,
    pub token: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
}

/// Connection details with defaults applied. Only produced by
/// [`GitLabConnection::resolve`], so every field is usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGitLabConnection {
    pub url: String,
    pub token: String,
    pub project_id: String,
    pub branch: String,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl GitLabConnection {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            token: token.into(),
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Validates required fields and applies defaults.
    pub fn resolve(self) -> Result<ResolvedGitLabConnection, ApiError> {
        let mut missing = Vec::new();
        if self.url.trim().is_empty() {
            missing.push("url");
        }
        if self.token.trim().is_empty() {
            missing.push("token");
        }
        if self.project_id.trim().is_empty() {
            missing.push("projectId");
        }
        if !missing.is_empty() {
            return Err(ApiError::not_configured(format!(
                "GitLab connection is missing: {}",
                missing.join(", ")
            )));
        }

        Ok(ResolvedGitLabConnection {
            url: self.url.trim_end_matches('/').to_string(),
            token: self.token,
            project_id: self.project_id,
            branch: or_default(self.branch, DEFAULT_BRANCH),
            commit_message: or_default(self.commit_message, DEFAULT_COMMIT_MESSAGE),
            author_name: or_default(self.author_name, DEFAULT_AUTHOR_NAME),
            author_email: or_default(self.author_email, DEFAULT_AUTHOR_EMAIL),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabUser {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabProject {
    pub id: u64,
    pub name: String,
    pub name_with_namespace: String,
    pub path: String,
    pub path_with_namespace: String,
    pub web_url: String,
    #[serde(default)]
    pub last_activity_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileEncoding {
    Base64,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabFile {
    pub file_path: String,
    pub content: String,
    pub encoding: FileEncoding,
}

/// Body of the file create/update endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCommitPayload {
    pub branch: String,
    pub content: String,
    pub encoding: FileEncoding,
    pub commit_message: String,
    pub author_name: String,
    pub author_email: String,
}

/// Commit metadata. File writes answer with `{file_path, branch}` only, so
/// everything but the identifying fields is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GitLabCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitLabBranch {
    pub name: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequestPayload {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    pub remove_source_branch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub web_url: String,
}

/// A generated test destined for the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFileSpec {
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
}

/// A local test file to push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalTestFile {
    pub path: String,
    pub content: String,
}

/// Directories scaffolded under the tests base path.
pub const SCAFFOLD_DIRS: [&str; 4] = ["ui", "api", "fixtures", "utils"];

/// `Open Calculator Page` → `test_open_calculator_page.py`.
pub fn test_file_name(test_name: &str) -> String {
    let mut snake = String::with_capacity(test_name.len());
    let mut pending_sep = false;
    for ch in test_name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !snake.is_empty() {
                snake.push('_');
            }
            snake.push(ch);
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    if snake.starts_with("test_") {
        format!("{snake}.py")
    } else if snake.is_empty() {
        "test_generated.py".to_string()
    } else {
        format!("test_{snake}.py")
    }
}

/// Directory of a test kind under the base path.
pub fn kind_dir(kind: TestKind) -> &'static str {
    match kind {
        TestKind::Ui => "ui",
        TestKind::Api => "api",
    }
}

pub fn readme_content(tests: &[TestFileSpec], generated_on: &str) -> String {
    let list = |kind: TestKind| {
        tests
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| format!("- {}", t.name))
            .collect::<Vec<_>>()
    };
    let ui = list(TestKind::Ui);
    let api = list(TestKind::Api);

    format!(
        r#"# Automated tests

Generated by TestOps Copilot from Cloud.ru

## Layout

```
tests/
├── ui/          # UI tests (Playwright)
├── api/         # API tests (pytest + requests)
├── fixtures/    # Test data
├── utils/       # Helpers
└── README.md
```

## Statistics

- Total tests: {total}
- UI tests: {ui_count}
- API tests: {api_count}

## Running

```bash
pip install -r requirements.txt
pytest ui/ -v
pytest api/ -v
pytest --alluredir=allure-results
```

Tests run in GitLab CI/CD on pushes to main/develop and on merge requests.

## Tests

### UI
{ui_list}

### API
{api_list}

---

*Generated: {generated_on}*
"#,
        total = tests.len(),
        ui_count = ui.len(),
        api_count = api.len(),
        ui_list = ui.join("\n"),
        api_list = api.join("\n"),
    )
}

pub fn ci_config(base_path: &str) -> String {
    format!(
        r#"# GitLab CI/CD configuration generated by TestOps Copilot

stages:
  - test
  - report
  - deploy

variables:
  PYTHON_VERSION: "3.10"
  ALLURE_VERSION: "2.24.0"

cache:
  key: ${{CI_COMMIT_REF_SLUG}}
  paths:
    - .cache/pip
    - allure-results

before_script:
  - python --version
  - pip install --upgrade pip
  - pip install -r requirements.txt
  - pip install pytest allure-pytest pytest-playwright requests

ui-tests:
  stage: test
  image: mcr.microsoft.com/playwright/python:v1.40.0
  script:
    - playwright install chromium
    - cd {base_path}
    - pytest ui/ -v --alluredir=allure-results
  artifacts:
    when: always
    paths:
      - {base_path}/allure-results/
    expire_in: 1 week
  only:
    - merge_requests
    - main
    - develop

api-tests:
  stage: test
  image: python:${{PYTHON_VERSION}}-slim
  script:
    - cd {base_path}
    - pytest api/ -v --alluredir=allure-results
  artifacts:
    when: always
    paths:
      - {base_path}/allure-results/
    expire_in: 1 week
  only:
    - merge_requests
    - main
    - develop

generate-report:
  stage: report
  image: frankescobar/allure-docker-service
  script:
    - allure generate allure-results -o allure-report --clean
  artifacts:
    paths:
      - allure-report/
    expire_in: 1 month
  only:
    - main
    - develop

pages:
  stage: deploy
  dependencies:
    - generate-report
  script:
    - mv allure-report public
  artifacts:
    paths:
      - public
  only:
    - main
"#
    )
}

/// GitLab failures surface under the GitLab integration code.
pub fn gitlab_error(error: ApiError, context: &str) -> ApiError {
    if error.is_not_configured() || error.is_unauthorized() {
        return error;
    }
    let status = error.status;
    let mut wrapped = ApiError::new(ErrorCode::GitLab, format!("{context}: {}", error.message))
        .with_detail("cause", serde_json::Value::String(error.code.to_string()));
    wrapped.status = status;
    wrapped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_applies_defaults() {
        let resolved = GitLabConnection::new("https://gitlab.cloud.ru/", "glpat", "12345")
            .resolve()
            .unwrap();
        assert_eq!(resolved.url, "https://gitlab.cloud.ru");
        assert_eq!(resolved.branch, "main");
        assert_eq!(resolved.commit_message, DEFAULT_COMMIT_MESSAGE);
        assert_eq!(resolved.author_name, "TestOps Copilot");
        assert_eq!(resolved.author_email, "testops@cloud.ru");
    }

    #[test]
    fn test_resolve_rejects_missing_fields() {
        let err = GitLabConnection::new("", "glpat", " ").resolve().unwrap_err();
        assert!(err.is_not_configured());
        assert!(err.message.contains("url"));
        assert!(err.message.contains("projectId"));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(test_file_name("Open Calculator Page"), "test_open_calculator_page.py");
        assert_eq!(test_file_name("test_login"), "test_login.py");
        assert_eq!(test_file_name("  API: GET /vms  "), "test_api_get_vms.py");
        assert_eq!(test_file_name("!!!"), "test_generated.py");
    }

    #[test]
    fn test_readme_counts() {
        let tests = vec![
            TestFileSpec {
                name: "open page".into(),
                content: String::new(),
                kind: TestKind::Ui,
            },
            TestFileSpec {
                name: "list vms".into(),
                content: String::new(),
                kind: TestKind::Api,
            },
        ];
        let readme = readme_content(&tests, "2024-01-20");
        assert!(readme.contains("- Total tests: 2"));
        assert!(readme.contains("### UI\n- open page"));
        assert!(readme.contains("*Generated: 2024-01-20*"));
    }

    #[test]
    fn test_ci_config_uses_base_path() {
        let config = ci_config("tests");
        assert!(config.contains("- cd tests"));
        assert!(config.contains("${CI_COMMIT_REF_SLUG}"));
    }

    #[test]
    fn test_commit_decodes_file_write_response() {
        let body = r#"{"file_path":"tests/ui/test_a.py","branch":"main"}"#;
        let commit: GitLabCommit = serde_json::from_str(body).unwrap();
        assert_eq!(commit.file_path.as_deref(), Some("tests/ui/test_a.py"));
        assert!(commit.id.is_empty());
    }
}
