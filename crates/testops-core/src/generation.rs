//! Test generation contracts and the stored test-case entity.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::error::{ApiError, ErrorCode};

/// Kind of test to generate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestKind {
    Ui,
    Api,
}

/// Test priority, ordered from most to least important.
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
pub enum Priority {
    Critical,
    Normal,
    Low,
}

/// A user's generation submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub product: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub requirements: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story: Option<String>,
    /// OpenAPI document for `api` generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi_spec: Option<serde_json::Value>,
    /// Base endpoint for `api` generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl GenerationRequest {
    pub fn new(
        product: impl Into<String>,
        kind: TestKind,
        requirements: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            product: product.into(),
            kind,
            requirements: requirements.into(),
            priority,
            owner: None,
            feature: None,
            story: None,
            openapi_spec: None,
            endpoint: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    pub fn with_story(mut self, story: impl Into<String>) -> Self {
        self.story = Some(story.into());
        self
    }

    pub fn with_openapi_spec(mut self, spec: serde_json::Value) -> Self {
        self.openapi_spec = Some(spec);
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Client-side checks run before the request leaves the process.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.product.trim().is_empty() {
            return Err(ApiError::validation("Product is required"));
        }
        if self.requirements.trim().is_empty() {
            return Err(ApiError::validation("Requirements must not be empty"));
        }
        if let Some(spec) = &self.openapi_spec {
            validate_openapi_spec(spec)?;
        }
        Ok(())
    }
}

/// Checks the minimal shape of an OpenAPI 3.x document.
pub fn validate_openapi_spec(spec: &serde_json::Value) -> Result<(), ApiError> {
    let mut problems = Vec::new();

    let version = spec.get("openapi").and_then(|v| v.as_str()).unwrap_or("");
    if !version.starts_with("3.") {
        problems.push("OpenAPI 3.x document required");
    }
    if spec
        .pointer("/info/title")
        .and_then(|v| v.as_str())
        .is_none()
    {
        problems.push("missing info.title");
    }
    let has_paths = spec
        .get("paths")
        .and_then(|v| v.as_object())
        .is_some_and(|paths| !paths.is_empty());
    if !has_paths {
        problems.push("no paths defined");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ApiError::new(ErrorCode::InvalidSpec, problems.join("; ")))
    }
}

/// Summary of one generated test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseSummary {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
}

/// Output of one generation. `test_cases` keeps generation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub code: String,
    #[serde(default)]
    pub test_cases: Vec<TestCaseSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TestCaseStatus {
    Generated,
    Saved,
    Published,
}

/// A test case held in the tests slice.
///
/// `id` is assigned locally and unique within the slice. The server's id for
/// the summary is kept as `source_id`; two generations may repeat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub source_id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub priority: Priority,
    pub status: TestCaseStatus,
    pub code: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TestCase {
    /// Materializes a generated summary into a stored test case.
    pub fn from_summary(
        summary: &TestCaseSummary,
        request: &GenerationRequest,
        code: &str,
        now: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source_id: summary.id.clone(),
            title: summary.title.clone(),
            kind: request.kind,
            priority: summary.priority.unwrap_or(request.priority),
            status: TestCaseStatus::Generated,
            code: code.to_string(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }
}

/// Result of `POST /tests/validate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeValidation {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<crate::standards::ValidationIssue>,
}

/// Result of `POST /tests/optimize`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub optimized: Vec<TestCaseSummary>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stored_case_gets_local_id() {
        let request = GenerationRequest::new("calculator", TestKind::Ui, "req", Priority::Low);
        let summary = TestCaseSummary {
            id: "tc-1".into(),
            title: "Add".into(),
            description: None,
            steps: None,
            expected_result: None,
            priority: None,
        };
        let a = TestCase::from_summary(&summary, &request, "code", "now");
        let b = TestCase::from_summary(&summary, &request, "code", "now");
        assert_ne!(a.id, b.id);
        assert_eq!(a.source_id, "tc-1");
        assert_eq!(serde_json::to_value(&a).unwrap()["sourceId"], json!("tc-1"));
    }

    #[test]
    fn test_request_wire_shape() {
        let request = GenerationRequest::new("calculator", TestKind::Ui, "req", Priority::Critical)
            .with_owner("qa-team");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], json!("ui"));
        assert_eq!(value["priority"], json!("critical"));
        assert_eq!(value["owner"], json!("qa-team"));
        assert!(value.get("openapiSpec").is_none());
    }

    #[test]
    fn test_unknown_kind_rejected_at_boundary() {
        let body = json!({
            "product": "calculator",
            "type": "unit",
            "requirements": "x",
            "priority": "normal"
        });
        assert!(serde_json::from_value::<GenerationRequest>(body).is_err());
    }

    #[test]
    fn test_validate_requires_requirements() {
        let request = GenerationRequest::new("calculator", TestKind::Api, "   ", Priority::Low);
        let err = request.validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
    }

    #[test]
    fn test_openapi_spec_validation() {
        let good = json!({
            "openapi": "3.0.1",
            "info": {"title": "Compute"},
            "paths": {"/vms": {}}
        });
        assert!(validate_openapi_spec(&good).is_ok());

        let bad = json!({"swagger": "2.0", "paths": {}});
        let err = validate_openapi_spec(&bad).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSpec);
        assert!(err.message.contains("info.title"));
    }

    #[test]
    fn test_result_keeps_case_order() {
        let body = json!({
            "code": "def test_x(): pass",
            "testCases": [
                {"id": "b", "title": "second"},
                {"id": "a", "title": "first", "expectedResult": "ok", "priority": "low"}
            ]
        });
        let result: GenerationResult = serde_json::from_value(body).unwrap();
        let ids: Vec<_> = result.test_cases.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(result.test_cases[1].expected_result.as_deref(), Some("ok"));
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical < Priority::Normal);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
    }
}
