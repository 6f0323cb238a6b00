//! Allure/pytest coding standards: issue types and the local rule checker.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// One finding against a piece of test source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub line: u32,
    pub column: u32,
    pub message: String,
    pub severity: Severity,
    pub rule: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Result of `POST /standards/validate` or the local checker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn count(&self, severity: Severity) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// The checked standards.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StandardRule {
    AllureImport,
    AllureTitle,
    Steps,
    Assertions,
    PriorityTag,
    OwnerLabel,
    FeatureStory,
}

impl StandardRule {
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Human-readable rule name reported in issues.
    pub fn title(&self) -> &'static str {
        match self {
            Self::AllureImport => "Allure Import",
            Self::AllureTitle => "Allure Decorators",
            Self::Steps => "Steps Definition",
            Self::Assertions => "Assertions",
            Self::PriorityTag => "Priority Labels",
            Self::OwnerLabel => "Owner Label",
            Self::FeatureStory => "Feature/Story",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::AllureImport | Self::AllureTitle | Self::Steps | Self::Assertions => {
                Severity::Error
            }
            Self::PriorityTag => Severity::Warning,
            Self::OwnerLabel | Self::FeatureStory => Severity::Info,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Self::AllureImport => "Missing `import allure`",
            Self::AllureTitle => "Missing @allure.title decorator",
            Self::Steps => "Test steps are not wrapped in `with allure.step`",
            Self::Assertions => "Test has no assertions",
            Self::PriorityTag => "Missing priority tag",
            Self::OwnerLabel => "Missing owner label",
            Self::FeatureStory => "Missing feature/story labels",
        }
    }

    fn suggestion(&self) -> &'static str {
        match self {
            Self::AllureImport => "Add `import allure` at the top of the file",
            Self::AllureTitle => "Add @allure.title(\"Test title\")",
            Self::Steps => "Wrap each step in `with allure.step(\"Step description\")`",
            Self::Assertions => "Add an assert statement that checks the result",
            Self::PriorityTag => "Add @allure.tag(\"CRITICAL|NORMAL|LOW\")",
            Self::OwnerLabel => "Add @allure.label(\"owner\", \"your-name\")",
            Self::FeatureStory => "Add @allure.feature(...) and @allure.story(...)",
        }
    }

    fn satisfied_by(&self, code: &str) -> bool {
        match self {
            Self::AllureImport => IMPORT_RE.is_match(code),
            Self::AllureTitle => code.contains("@allure.title("),
            Self::Steps => code.contains("allure.step("),
            Self::Assertions => ASSERT_RE.is_match(code),
            Self::PriorityTag => PRIORITY_RE.is_match(code),
            Self::OwnerLabel => OWNER_RE.is_match(code),
            Self::FeatureStory => {
                code.contains("@allure.feature(") && code.contains("@allure.story(")
            }
        }
    }
}

/// Body of `POST /standards/validate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardsRequest {
    pub code: String,
    #[serde(default)]
    pub rules: Vec<StandardRule>,
}

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(import allure\b|from allure\b)").expect("valid import regex")
});
static ASSERT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*assert\b|\bexpect\(").expect("valid assert regex"));
static PRIORITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@allure\.(tag|severity)\(\s*["']?(CRITICAL|NORMAL|LOW|allure\.severity_level)"#)
        .expect("valid priority regex")
});
static OWNER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"@allure\.label\(\s*["']owner["']"#).expect("valid owner regex")
});
static TEST_FN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*(async\s+)?def test_\w*").expect("valid test fn regex"));

/// 1-based line of the first test function, or 1 when there is none.
fn first_test_line(code: &str) -> u32 {
    TEST_FN_RE
        .find(code)
        .map(|m| code[..m.start()].matches('\n').count() as u32 + 1)
        .unwrap_or(1)
}

fn location(rule: StandardRule, code: &str) -> (u32, u32) {
    let test_line = first_test_line(code);
    let last_line = code.lines().count().max(1) as u32;
    match rule {
        StandardRule::AllureImport => (1, 1),
        StandardRule::Steps => (test_line + 1, 5),
        StandardRule::Assertions => (last_line, 5),
        _ => (test_line, 1),
    }
}

/// Checks `code` against `rules` (all rules when empty).
///
/// The report is valid when no error-severity issue was found.
pub fn check_code(code: &str, rules: &[StandardRule]) -> ValidationReport {
    let selected = if rules.is_empty() {
        StandardRule::all()
    } else {
        rules.to_vec()
    };

    let issues: Vec<ValidationIssue> = selected
        .into_iter()
        .filter(|rule| !rule.satisfied_by(code))
        .map(|rule| {
            let (line, column) = location(rule, code);
            ValidationIssue {
                line,
                column,
                message: rule.message().to_string(),
                severity: rule.severity(),
                rule: rule.title().to_string(),
                suggestion: Some(rule.suggestion().to_string()),
            }
        })
        .collect();

    let suggestions = issues
        .iter()
        .filter_map(|issue| issue.suggestion.clone())
        .collect();

    ValidationReport {
        valid: !issues.iter().any(|issue| issue.severity == Severity::Error),
        issues,
        suggestions,
    }
}

/// Inserts the boilerplate the checker asks for.
///
/// Adds the Allure import and any missing decorators above the first test
/// function. Steps and assertions need real test logic and are left alone.
pub fn auto_fix(code: &str) -> String {
    let mut decorators = Vec::new();
    if !StandardRule::AllureTitle.satisfied_by(code) {
        decorators.push("@allure.title(\"Describe the test\")".to_string());
    }
    if !StandardRule::PriorityTag.satisfied_by(code) {
        decorators.push("@allure.tag(\"NORMAL\")".to_string());
    }
    if !StandardRule::OwnerLabel.satisfied_by(code) {
        decorators.push("@allure.label(\"owner\", \"testops-copilot\")".to_string());
    }
    if !code.contains("@allure.feature(") {
        decorators.push("@allure.feature(\"auto-fixed\")".to_string());
    }
    if !code.contains("@allure.story(") {
        decorators.push("@allure.story(\"auto-fixed\")".to_string());
    }

    let mut lines: Vec<String> = code.lines().map(str::to_string).collect();

    if !decorators.is_empty() {
        if let Some(m) = TEST_FN_RE.find(code) {
            let index = code[..m.start()].matches('\n').count();
            let indent: String = lines[index]
                .chars()
                .take_while(|c| c.is_whitespace())
                .collect();
            for (offset, decorator) in decorators.into_iter().enumerate() {
                lines.insert(index + offset, format!("{indent}{decorator}"));
            }
        }
    }

    if !StandardRule::AllureImport.satisfied_by(code) {
        lines.insert(0, "import allure".to_string());
    }

    let mut fixed = lines.join("\n");
    if code.ends_with('\n') {
        fixed.push('\n');
    }
    fixed
}
