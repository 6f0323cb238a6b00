//! AI-model provider calls (Cloud.ru Evolution).
//!
//! Every call needs the model API key, which is distinct from the session
//! credential. Without one the service answers with a configuration error
//! and makes no call.

use chrono::Utc;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use testops_core::coverage::{CoverageSnapshot, GapPriority};
use testops_core::error::{ApiError, ErrorCode};
use testops_core::generation::TestKind;
use testops_core::model::{
    CHAT_MODEL, CODE_MODEL, ChatBody, ChatMessage, ChatRequest, ChatResponse, CompletionBody,
    CompletionRequest, CompletionResponse, ComplexityEstimate, CoverageAdvice,
    DEFAULT_EMBEDDING_MODEL, EmbeddingRequest, EmbeddingResponse, GeneratedCases, ModelInfo,
    StandardsReview, UsageInfo, estimate_complexity,
};
use tracing::{debug, warn};

use crate::data_source::{Resolved, SourceResolver};
use crate::fixtures;
use crate::gateway::{ApiCall, ApiGateway};

pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.cloud.ru/evolution/v1";

const DEFAULT_STANDARDS: [&str; 4] = ["AAA", "Allure", "assertions", "descriptions"];

const CASES_SYSTEM_PROMPT: &str = "You are an assistant that writes test cases. \
Analyse the requirements and produce structured test cases in Allure TestOps format: \
a specific title, a description of what is checked, sequential steps and the expected result. \
UI tests check the interface, API tests check API responses.";

const CODE_SYSTEM_PROMPT: &str = "You are an expert in writing Python tests in Allure TestOps format. \
Follow Arrange-Act-Assert, add every Allure decorator, describe steps with `with allure.step`, \
give assertions clear failure messages, name functions and classes properly and add docstrings. \
Use Playwright for UI tests and requests for API tests.";

const COVERAGE_SYSTEM_PROMPT: &str = "You are a QA expert who analyses test coverage. \
Study the coverage data and the existing tests and give concrete recommendations.";

const REVIEW_SYSTEM_PROMPT: &str =
    "You are an expert test code reviewer. Check test code against quality standards.";

/// Test cases come back either as titles or as described objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCase {
    Title(String),
    Described { title: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCases {
    test_cases: Vec<WireCase>,
    #[serde(default)]
    code: Option<String>,
}

impl From<WireCases> for GeneratedCases {
    fn from(wire: WireCases) -> Self {
        Self {
            test_cases: wire
                .test_cases
                .into_iter()
                .map(|case| match case {
                    WireCase::Title(title) | WireCase::Described { title } => title,
                })
                .collect(),
            code: wire.code,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelService {
    gateway: ApiGateway,
    resolver: SourceResolver,
    base_url: String,
    api_key: Option<String>,
}

impl ModelService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver, base_url: impl Into<String>) -> Self {
        Self {
            gateway,
            resolver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Blank keys count as missing.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Text completion. Credential, rate-limit and quota failures propagate;
    /// anything else gets a demonstration answer.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ApiError> {
        let key = self.key()?;
        let resolved = self
            .resolver
            .try_resolve(
                "completion",
                || async {
                    let call = self.call("completions", key).json(&CompletionBody::from(request))?;
                    self.gateway.request_raw(call).await
                },
                must_surface,
                || fixtures::model::completion(request, Utc::now().timestamp()),
            )
            .await?;
        Ok(resolved.value)
    }

    /// Chat completion, answered locally when the provider fails.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.key()?;
        let resolved = self
            .resolver
            .resolve(
                "chat",
                || self.remote_chat(request),
                || fixtures::model::chat(request, Utc::now().timestamp()),
            )
            .await;
        Ok(resolved.value)
    }

    pub async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, ApiError> {
        let key = self.key()?;
        let mut body = request.clone();
        body.model.get_or_insert_with(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let call = self.call("embeddings", key).json(&body)?;
        self.gateway.request_raw(call).await.inspect_err(|err| {
            warn!("[Model] Embeddings failed: {}", err);
        })
    }

    pub async fn models(&self) -> Result<Resolved<Vec<ModelInfo>>, ApiError> {
        self.get_or_fixed("models", "models", fixtures::model::models)
            .await
    }

    pub async fn usage(&self) -> Result<Resolved<UsageInfo>, ApiError> {
        self.get_or_fixed("usage", "usage", || {
            fixtures::model::usage(Utc::now().date_naive())
        })
        .await
    }

    /// `true` when a key is set and the catalogue answers.
    pub async fn check_availability(&self) -> bool {
        let Ok(key) = self.key() else {
            return false;
        };
        self.gateway
            .request_raw::<Vec<ModelInfo>>(ApiCall::get(self.url("models")).without_session().bearer(key))
            .await
            .is_ok()
    }

    /// Test cases for `requirements` through chat. An answer that is not the
    /// requested JSON is kept whole as a single case.
    pub async fn generate_test_cases(
        &self,
        requirements: &str,
        kind: TestKind,
        context: Option<&str>,
    ) -> Result<GeneratedCases, ApiError> {
        self.key()?;
        let kind_label = kind.as_ref().to_uppercase();
        let context = context
            .map(|c| format!("Context: {c}\n\n"))
            .unwrap_or_default();
        let prompt = format!(
            "Generate {kind_label} test cases for the following requirements:\n\n\
             {requirements}\n\n{context}Test type: {kind_label}\n\n\
             Return JSON: {{\"testCases\": [{{\"title\": \"...\", \"description\": \"...\", \
             \"steps\": [\"...\"], \"expected\": \"...\", \"priority\": \"CRITICAL|NORMAL|LOW\"}}], \
             \"code\": \"optional Allure TestOps Python code\"}}"
        );
        let request = ChatRequest::new(vec![
            ChatMessage::system(CASES_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_model(CHAT_MODEL)
        .with_temperature(0.3)
        .with_max_tokens(3000);

        let resolved = self
            .resolver
            .resolve(
                "generate_test_cases",
                || async {
                    let response = self.remote_chat(&request).await?;
                    let content = response.content();
                    Ok(match parse_json::<WireCases>(content) {
                        Some(wire) => wire.into(),
                        None => GeneratedCases {
                            test_cases: vec![content.to_string()],
                            code: Some(fixtures::model::code_from_requirements(
                                requirements,
                                kind,
                            )),
                        },
                    })
                },
                || fixtures::model::test_cases(requirements, kind),
            )
            .await;
        Ok(resolved.value)
    }

    /// Python test source for one test case.
    pub async fn generate_test_code(
        &self,
        test_case: &str,
        kind: TestKind,
        framework: &str,
    ) -> Result<String, ApiError> {
        self.key()?;
        let prompt = format!(
            "Write Python code for this test case:\n\nTest type: {}\nFramework: {framework}\n\
             Test case: {test_case}\n\nReturn only Python code, without explanations or Markdown.",
            kind.as_ref().to_uppercase()
        );
        let request = ChatRequest::new(vec![
            ChatMessage::system(CODE_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_model(CODE_MODEL)
        .with_temperature(0.2)
        .with_max_tokens(2000);

        let resolved = self
            .resolver
            .resolve(
                "generate_test_code",
                || async {
                    let response = self.remote_chat(&request).await?;
                    Ok(response.content().to_string())
                },
                || {
                    let today = Utc::now().format("%Y-%m-%d").to_string();
                    fixtures::model::test_code(test_case, kind, framework, &today)
                },
            )
            .await;
        Ok(resolved.value)
    }

    pub async fn coverage_advice(
        &self,
        coverage: &CoverageSnapshot,
        existing_tests: &[String],
    ) -> Result<CoverageAdvice, ApiError> {
        self.key()?;
        let coverage_json = serde_json::to_string_pretty(coverage).unwrap_or_default();
        let tests_json = serde_json::to_string_pretty(existing_tests).unwrap_or_default();
        let prompt = format!(
            "Analyse the test coverage data and give recommendations.\n\n\
             Coverage data: {coverage_json}\n\nExisting tests: {tests_json}\n\n\
             Return JSON: {{\"recommendations\": [\"...\"], \"priority\": \"high|medium|low\"}}"
        );
        let request = ChatRequest::new(vec![
            ChatMessage::system(COVERAGE_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_model(CHAT_MODEL)
        .with_temperature(0.5);

        let resolved = self
            .resolver
            .resolve(
                "coverage_advice",
                || async {
                    let response = self.remote_chat(&request).await?;
                    let content = response.content();
                    Ok(parse_json(content).unwrap_or_else(|| CoverageAdvice {
                        recommendations: vec![content.to_string()],
                        priority: GapPriority::Medium,
                    }))
                },
                fixtures::model::coverage_advice,
            )
            .await;
        Ok(resolved.value)
    }

    /// Model review of test code against named standards (a default set when
    /// empty).
    pub async fn review_standards(
        &self,
        code: &str,
        standards: &[&str],
    ) -> Result<StandardsReview, ApiError> {
        self.key()?;
        let standards = if standards.is_empty() {
            &DEFAULT_STANDARDS[..]
        } else {
            standards
        };
        let prompt = format!(
            "Check this test code against the standards: {}\n\nCode:\n```python\n{code}\n```\n\n\
             Return JSON: {{\"valid\": true, \"issues\": [\"...\"], \"suggestions\": [\"...\"]}}",
            standards.join(", ")
        );
        let request = ChatRequest::new(vec![
            ChatMessage::system(REVIEW_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ])
        .with_model(CODE_MODEL)
        .with_temperature(0.3);

        let resolved = self
            .resolver
            .resolve(
                "review_standards",
                || async {
                    let response = self.remote_chat(&request).await?;
                    Ok(parse_json(response.content()).unwrap_or_else(|| StandardsReview {
                        valid: false,
                        issues: vec!["Could not analyze the code".to_string()],
                        suggestions: vec!["Review the code manually".to_string()],
                    }))
                },
                fixtures::model::standards_review,
            )
            .await;
        Ok(resolved.value)
    }

    /// Local heuristic; needs no key.
    pub fn estimate_complexity(&self, code: &str) -> ComplexityEstimate {
        estimate_complexity(code)
    }

    async fn remote_chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let key = self.key()?;
        let call = self.call("chat/completions", key).json(&ChatBody::from(request))?;
        self.gateway.request_raw(call).await
    }

    async fn get_or_fixed<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        fixed: impl FnOnce() -> T,
    ) -> Result<Resolved<T>, ApiError> {
        let key = self.key()?;
        Ok(self
            .resolver
            .resolve(
                operation,
                || {
                    self.gateway
                        .request_raw(ApiCall::get(self.url(path)).without_session().bearer(key))
                },
                fixed,
            )
            .await)
    }

    fn key(&self) -> Result<&str, ApiError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::not_configured("Model API key is not configured"))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    fn call(&self, path: &str, key: &str) -> ApiCall {
        ApiCall::post(self.url(path)).without_session().bearer(key)
    }
}

/// Failures a demonstration answer must not hide.
fn must_surface(err: &ApiError) -> bool {
    matches!(err.code, ErrorCode::Auth | ErrorCode::RateLimit)
        || err.code.as_str() == "QUOTA_EXCEEDED"
}

/// Parses a JSON answer, tolerating a Markdown code fence around it.
fn parse_json<T: DeserializeOwned>(content: &str) -> Option<T> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    match serde_json::from_str(unfenced.trim()) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!("[Model] Answer is not the requested JSON: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::DataSource;
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use testops_core::model::EmbeddingInput;

    fn service(transport: Arc<ScriptedTransport>) -> ModelService {
        ModelService::new(
            ApiGateway::new("http://localhost:8000/api", transport),
            SourceResolver::default(),
            DEFAULT_MODEL_BASE_URL,
        )
        .with_api_key(Some("model-key".to_string()))
    }

    fn chat_reply(content: &str) -> Reply {
        Reply::json(
            200,
            json!({
                "id": "c1",
                "choices": [{"message": {"role": "assistant", "content": content}, "index": 0, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
                "created": 1,
                "model": "evolution-chat-v1"
            }),
        )
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let transport = Arc::new(ScriptedTransport::new());
        let service = service(transport.clone()).with_api_key(Some("  ".into()));

        let err = service
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(err.is_not_configured());
        assert!(service.models().await.unwrap_err().is_not_configured());
        assert!(!service.check_availability().await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_completion_uses_model_key_and_provider_headers() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/completions",
            Reply::json(
                200,
                json!({
                    "id": "r1",
                    "choices": [{"text": "ok", "index": 0, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2},
                    "created": 1,
                    "model": "evolution-foundation-v1"
                }),
            ),
        ));
        let response = service(transport.clone())
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(response.text(), "ok");

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.header("authorization"), Some("Bearer model-key"));
        assert_eq!(sent.header("x-cloudru-client"), Some("testops-copilot"));
        assert_eq!(sent.header("x-api-version"), Some("v1"));
        assert_eq!(sent.json_body().unwrap()["max_tokens"], 2000);
    }

    #[tokio::test]
    async fn test_completion_fallback_policy() {
        let flaky = service(Arc::new(ScriptedTransport::failing()));
        let response = flaky
            .complete(&CompletionRequest::new("Generate UI tests"))
            .await
            .unwrap();
        assert!(response.text().contains("Add service"));

        let limited = service(Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/completions",
            Reply::status(429).with_header("retry-after", "30"),
        )));
        let err = limited
            .complete(&CompletionRequest::new("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RateLimit);
    }

    #[tokio::test]
    async fn test_embeddings_propagate_and_default_model() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/embeddings",
            Reply::status(500),
        ));
        let request = EmbeddingRequest {
            input: EmbeddingInput::Single("text".into()),
            model: None,
        };
        assert!(service(transport.clone()).embeddings(&request).await.is_err());
        let body = transport.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body["model"], DEFAULT_EMBEDDING_MODEL);
    }

    #[tokio::test]
    async fn test_generate_test_cases_parses_fenced_json() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/chat/completions",
            chat_reply("```json\n{\"testCases\": [\"Login\", {\"title\": \"Logout\", \"steps\": []}]}\n```"),
        ));
        let cases = service(transport.clone())
            .generate_test_cases("auth flows", TestKind::Ui, None)
            .await
            .unwrap();
        assert_eq!(cases.test_cases, vec!["Login", "Logout"]);
        assert!(cases.code.is_none());

        let body = transport.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body["model"], CHAT_MODEL);
        assert_eq!(body["max_tokens"], 3000);
    }

    #[tokio::test]
    async fn test_generate_test_cases_plain_text_and_failure() {
        let plain = service(Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/chat/completions",
            chat_reply("1. Login works"),
        )));
        let cases = plain
            .generate_test_cases("auth", TestKind::Api, Some("billing"))
            .await
            .unwrap();
        assert_eq!(cases.test_cases, vec!["1. Login works"]);
        assert!(cases.code.unwrap().contains("generated-api-tests"));

        let failed = service(Arc::new(ScriptedTransport::failing()))
            .generate_test_cases("auth", TestKind::Api, None)
            .await
            .unwrap();
        assert_eq!(failed.test_cases.len(), 6);
    }

    #[tokio::test]
    async fn test_advice_and_review_fallbacks() {
        let service = service(Arc::new(ScriptedTransport::failing()));
        let advice = service
            .coverage_advice(&CoverageSnapshot::new(10, 5), &[])
            .await
            .unwrap();
        assert_eq!(advice.priority, GapPriority::Medium);
        assert_eq!(advice.recommendations.len(), 1);

        let review = service.review_standards("assert True", &[]).await.unwrap();
        assert!(!review.valid);
        assert_eq!(review.suggestions, vec!["Try again later"]);

        let code = service
            .generate_test_code("List VMs", TestKind::Api, "pytest")
            .await
            .unwrap();
        assert!(code.contains("import allure"));
    }

    #[tokio::test]
    async fn test_review_non_json_answer() {
        let service = service(Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/chat/completions",
            chat_reply("Looks fine to me"),
        )));
        let review = service.review_standards("assert True", &["Allure"]).await.unwrap();
        assert!(!review.valid);
        assert_eq!(review.issues, vec!["Could not analyze the code"]);
    }

    #[tokio::test]
    async fn test_catalogue_and_usage_fall_back() {
        let service = service(Arc::new(ScriptedTransport::failing()));
        let models = service.models().await.unwrap();
        assert_eq!(models.source, DataSource::Fixed);
        assert_eq!(models.value.len(), 3);

        let usage = service.usage().await.unwrap().value;
        assert_eq!(usage.used_tokens, 12_500);
    }

    #[tokio::test]
    async fn test_chat_answers_locally_on_failure() {
        let service = service(Arc::new(ScriptedTransport::failing()));
        let request = ChatRequest::new(vec![ChatMessage::user("Cover the API")]);
        let response = service.chat(&request).await.unwrap();
        assert!(response.content().contains("CRUD"));
    }
}
