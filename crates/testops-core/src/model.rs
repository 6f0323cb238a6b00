//! Contracts of the AI-model provider (Cloud.ru Evolution).

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub const DEFAULT_MODEL: &str = "evolution-foundation-v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "evolution-embedding-v1";
pub const CHAT_MODEL: &str = "evolution-chat-v1";
pub const CODE_MODEL: &str = "evolution-code-v1";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
pub const DEFAULT_TOP_P: f32 = 0.9;

/// A text-completion request as built by callers. Unset knobs take the
/// provider defaults when the wire body is built.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Wire body of `POST /completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionBody<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub stop: Vec<String>,
}

impl<'a> From<&'a CompletionRequest> for CompletionBody<'a> {
    fn from(request: &'a CompletionRequest) -> Self {
        Self {
            model: request.model_or_default(),
            prompt: &request.prompt,
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: request
                .stop
                .clone()
                .unwrap_or_else(|| vec!["```".to_string(), "\n\n".to_string()]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(alias = "promptTokens")]
    pub prompt_tokens: u32,
    #[serde(default, alias = "completionTokens")]
    pub completion_tokens: u32,
    #[serde(alias = "totalTokens")]
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Rough estimate at four characters per token.
    pub fn estimate(prompt_chars: usize, completion_chars: usize) -> Self {
        let tokens = |chars: usize| chars.div_ceil(4) as u32;
        Self {
            prompt_tokens: tokens(prompt_chars),
            completion_tokens: tokens(completion_chars),
            total_tokens: tokens(prompt_chars + completion_chars),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
    pub index: u32,
    #[serde(alias = "finishReason")]
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub id: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: TokenUsage,
    pub created: i64,
    pub model: String,
}

impl CompletionResponse {
    pub fn text(&self) -> &str {
        self.choices.first().map(|c| c.text.as_str()).unwrap_or("")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Content of the last message, the one the model answers.
    pub fn last_content(&self) -> &str {
        self.messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Wire body of `POST /chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatBody<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<&'a [String]>,
}

impl<'a> From<&'a ChatRequest> for ChatBody<'a> {
    fn from(request: &'a ChatRequest) -> Self {
        Self {
            model: request.model_or_default(),
            messages: &request.messages,
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            top_p: request.top_p.unwrap_or(DEFAULT_TOP_P),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: request.stop.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
    pub index: u32,
    #[serde(alias = "finishReason")]
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub id: String,
    pub choices: Vec<ChatChoice>,
    pub usage: TokenUsage,
    pub created: i64,
    pub model: String,
}

impl ChatResponse {
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("")
    }
}

/// One text or a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub input: EmbeddingInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub embedding: Vec<f32>,
    pub index: u32,
    #[serde(default)]
    pub object: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<Embedding>,
    pub model: String,
    pub usage: TokenUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price per 1000 prompt tokens.
    pub prompt: f64,
    /// Price per 1000 completion tokens.
    pub completion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub max_tokens: u32,
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<Pricing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageInfo {
    pub used_tokens: u64,
    pub remaining_tokens: u64,
    pub cost: f64,
    pub reset_date: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComplexityLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityEstimate {
    pub complexity: ComplexityLevel,
    pub score: u32,
    pub factors: Vec<String>,
}

/// Heuristic complexity of a test source file.
pub fn estimate_complexity(code: &str) -> ComplexityEstimate {
    let lines = code.split('\n').count();
    let assertions = code.matches("assert").count();
    let steps = code.matches("with allure.step").count();

    let mut score = 0;
    let mut factors = Vec::new();

    if lines > 100 {
        score += 30;
        factors.push("Large number of lines".to_string());
    }
    if assertions > 10 {
        score += 25;
        factors.push("Many assertions".to_string());
    }
    if steps > 5 {
        score += 20;
        factors.push("Deep step structure".to_string());
    }
    if code.contains("try:") && code.contains("except") {
        score += 15;
        factors.push("Exception handling".to_string());
    }
    if code.contains("for ") || code.contains("while ") {
        score += 10;
        factors.push("Loops inside tests".to_string());
    }

    let complexity = if score > 60 {
        ComplexityLevel::High
    } else if score > 30 {
        ComplexityLevel::Medium
    } else {
        ComplexityLevel::Low
    };

    ComplexityEstimate {
        complexity,
        score,
        factors,
    }
}

/// Test cases produced through chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCases {
    pub test_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Coverage advice produced through chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageAdvice {
    pub recommendations: Vec<String>,
    pub priority: crate::coverage::GapPriority,
}

/// Standards review produced through chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandardsReview {
    pub valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_body_defaults() {
        let request = CompletionRequest::new("hello");
        let body = serde_json::to_value(CompletionBody::from(&request)).unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 2000);
        assert_eq!(body["stop"], serde_json::json!(["```", "\n\n"]));
    }

    #[test]
    fn test_chat_body_omits_stop() {
        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_model(CHAT_MODEL);
        let body = serde_json::to_value(ChatBody::from(&request)).unwrap();
        assert_eq!(body["model"], CHAT_MODEL);
        assert!(body.get("stop").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_usage_accepts_both_casings() {
        let snake: TokenUsage =
            serde_json::from_str(r#"{"prompt_tokens":1,"completion_tokens":2,"total_tokens":3}"#)
                .unwrap();
        let camel: TokenUsage =
            serde_json::from_str(r#"{"promptTokens":1,"completionTokens":2,"totalTokens":3}"#)
                .unwrap();
        assert_eq!(snake, camel);
    }

    #[test]
    fn test_embedding_input_shapes() {
        let single = serde_json::to_value(EmbeddingInput::Single("a".into())).unwrap();
        assert_eq!(single, serde_json::json!("a"));
        let batch: EmbeddingInput = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(batch, EmbeddingInput::Batch(vec!["a".into(), "b".into()]));
    }

    #[test]
    fn test_estimate_complexity() {
        let simple = estimate_complexity("def test_x():\n    assert True\n");
        assert_eq!(simple.complexity, ComplexityLevel::Low);
        assert_eq!(simple.score, 0);

        let mut heavy = String::from("try:\n    pass\nexcept Exception:\n    pass\n");
        for i in 0..120 {
            heavy.push_str(&format!("assert value_{i}\n"));
        }
        let estimate = estimate_complexity(&heavy);
        assert_eq!(estimate.score, 70);
        assert_eq!(estimate.complexity, ComplexityLevel::High);
        assert_eq!(estimate.factors.len(), 3);
    }

    #[test]
    fn test_token_estimate() {
        let usage = TokenUsage::estimate(9, 4);
        assert_eq!(usage.prompt_tokens, 3);
        assert_eq!(usage.completion_tokens, 1);
        assert_eq!(usage.total_tokens, 4);
    }
}
