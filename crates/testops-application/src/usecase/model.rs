use std::collections::BTreeMap;

use testops_core::coverage::CoverageSnapshot;
use testops_core::error::{ApiError, ErrorCode};
use testops_core::generation::TestKind;
use testops_core::model::{
    ChatRequest, ChatResponse, ComplexityEstimate, CompletionRequest, CompletionResponse,
    CoverageAdvice, EmbeddingRequest, EmbeddingResponse, GeneratedCases, ModelInfo,
    StandardsReview, UsageInfo,
};
use testops_core::notification::Notification;
use testops_interaction::services::ModelService;
use tracing::info;

use super::{CopilotUseCase, now};
use crate::store::{Action, Field, IntegrationsAction};

pub const MODEL_INTEGRATION_ID: &str = "cloud-ru-api";

impl CopilotUseCase {
    async fn model_service(&self) -> ModelService {
        self.model.read().await.clone()
    }

    pub async fn model_configured(&self) -> bool {
        self.model.read().await.is_configured()
    }

    /// Saves the model key and checks it against the provider.
    pub async fn connect_model(&self, api_key: &str) -> Result<(), ApiError> {
        let ticket = self.store.begin(Field::Integrations);
        if let Err(e) = self.persisted.set_model_api_key(api_key).await {
            tracing::error!("[Model] Failed to persist API key: {}", e);
        }
        let service = self
            .model_service()
            .await
            .with_api_key(Some(api_key.to_string()));
        let available = service.check_availability().await;
        *self.model.write().await = service;

        if available {
            info!("[Model] Provider reachable");
            self.store.settle(
                ticket,
                Action::Integrations(IntegrationsAction::Connected {
                    id: MODEL_INTEGRATION_ID.to_string(),
                    settings: BTreeMap::from([("apiKey".to_string(), api_key.to_string())]),
                    now: now(),
                }),
            );
            self.notify(Notification::success("Cloud.ru API connected"));
            Ok(())
        } else {
            let err = ApiError::new(
                ErrorCode::ModelUnavailable,
                "The model provider did not accept the API key",
            );
            self.store.settle(
                ticket,
                Action::Integrations(IntegrationsAction::Failed {
                    id: MODEL_INTEGRATION_ID.to_string(),
                    message: err.message.clone(),
                }),
            );
            self.report("connect_model", &err);
            Err(err)
        }
    }

    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, ApiError> {
        self.model_service()
            .await
            .complete(request)
            .await
            .inspect_err(|err| self.report("complete", err))
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        self.model_service()
            .await
            .chat(request)
            .await
            .inspect_err(|err| self.report("chat", err))
    }

    pub async fn embeddings(&self, request: &EmbeddingRequest) -> Result<EmbeddingResponse, ApiError> {
        self.model_service()
            .await
            .embeddings(request)
            .await
            .inspect_err(|err| self.report("embeddings", err))
    }

    pub async fn available_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        Ok(self.model_service().await.models().await?.value)
    }

    pub async fn model_usage(&self) -> Result<UsageInfo, ApiError> {
        Ok(self.model_service().await.usage().await?.value)
    }

    pub async fn model_available(&self) -> bool {
        self.model_service().await.check_availability().await
    }

    pub async fn suggest_test_cases(
        &self,
        requirements: &str,
        kind: TestKind,
        context: Option<&str>,
    ) -> Result<GeneratedCases, ApiError> {
        self.model_service()
            .await
            .generate_test_cases(requirements, kind, context)
            .await
            .inspect_err(|err| self.report("suggest_test_cases", err))
    }

    pub async fn write_test_code(
        &self,
        test_case: &str,
        kind: TestKind,
        framework: &str,
    ) -> Result<String, ApiError> {
        self.model_service()
            .await
            .generate_test_code(test_case, kind, framework)
            .await
            .inspect_err(|err| self.report("write_test_code", err))
    }

    pub async fn coverage_advice(
        &self,
        coverage: &CoverageSnapshot,
        existing_tests: &[String],
    ) -> Result<CoverageAdvice, ApiError> {
        self.model_service()
            .await
            .coverage_advice(coverage, existing_tests)
            .await
            .inspect_err(|err| self.report("coverage_advice", err))
    }

    pub async fn review_standards(
        &self,
        code: &str,
        standards: &[&str],
    ) -> Result<StandardsReview, ApiError> {
        self.model_service()
            .await
            .review_standards(code, standards)
            .await
            .inspect_err(|err| self.report("review_standards", err))
    }

    pub async fn estimate_complexity(&self, code: &str) -> ComplexityEstimate {
        self.model_service().await.estimate_complexity(code)
    }
}
