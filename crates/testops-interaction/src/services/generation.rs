//! Test generation.

use serde::Serialize;
use testops_core::error::{ApiError, ErrorCode};
use testops_core::generation::{
    CodeValidation, GenerationRequest, GenerationResult, OptimizationResult, TestCaseSummary,
};
use tracing::{info, warn};

use crate::data_source::{Resolved, SourceResolver};
use crate::gateway::{ApiCall, ApiGateway};

pub const DEFAULT_OWNER: &str = "testops-copilot";
pub const DEFAULT_STORY: &str = "auto-generated";

#[derive(Serialize)]
struct BatchBody<'a> {
    requests: &'a [GenerationRequest],
}

#[derive(Serialize)]
struct CodeBody<'a> {
    code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptimizeBody<'a> {
    test_cases: &'a [TestCaseSummary],
}

#[derive(Debug, Clone)]
pub struct GenerationService {
    gateway: ApiGateway,
    resolver: SourceResolver,
}

impl GenerationService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Generates tests for one request. Failures propagate with a
    /// user-facing message; the error code is kept.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult, ApiError> {
        request.validate()?;
        let request = with_default_tags(request);
        info!(
            "[Generation] Generating {} tests for {}",
            request.kind, request.product
        );

        let call = ApiCall::post("/tests/generate").json(&request)?;
        self.gateway
            .request::<GenerationResult>(call)
            .await
            .map_err(friendly_error)
    }

    pub async fn generate_batch(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResult>, ApiError> {
        for request in &requests {
            request.validate()?;
        }
        let requests: Vec<_> = requests.into_iter().map(with_default_tags).collect();
        let call = ApiCall::post("/tests/generate/batch").json(&BatchBody {
            requests: &requests,
        })?;
        self.gateway.request(call).await.inspect_err(|err| {
            warn!("[Generation] Batch generation failed: {}", err);
        })
    }

    pub async fn validate_code(&self, code: &str) -> Resolved<CodeValidation> {
        self.resolver
            .resolve(
                "validate_code",
                || async {
                    let call = ApiCall::post("/tests/validate").json(&CodeBody { code })?;
                    self.gateway.request(call).await
                },
                || CodeValidation {
                    valid: false,
                    issues: Vec::new(),
                },
            )
            .await
    }

    /// Falls back to the input unchanged with no suggestions.
    pub async fn optimize(&self, test_cases: &[TestCaseSummary]) -> Resolved<OptimizationResult> {
        self.resolver
            .resolve(
                "optimize",
                || async {
                    let call = ApiCall::post("/tests/optimize").json(&OptimizeBody { test_cases })?;
                    self.gateway.request(call).await
                },
                || OptimizationResult {
                    optimized: test_cases.to_vec(),
                    suggestions: Vec::new(),
                },
            )
            .await
    }
}

/// Example test titles offered for a known product.
pub fn examples_for_product(product: &str) -> Vec<String> {
    let examples: &[&str] = match product {
        "calculator" => &[
            "Check the \"Add service\" button",
            "Price calculation when parameters change",
            "Product catalogue",
            "Mobile layout",
        ],
        "evolution-compute" => &[
            "Create a virtual machine",
            "List virtual machines",
            "Update VM configuration",
            "Delete a virtual machine",
            "Disk management",
        ],
        _ => &[],
    };
    examples.iter().map(|e| e.to_string()).collect()
}

fn with_default_tags(mut request: GenerationRequest) -> GenerationRequest {
    if request.owner.is_none() {
        request.owner = Some(DEFAULT_OWNER.to_string());
    }
    if request.feature.is_none() {
        request.feature = Some(request.product.clone());
    }
    if request.story.is_none() {
        request.story = Some(DEFAULT_STORY.to_string());
    }
    request
}

fn friendly_error(err: ApiError) -> ApiError {
    warn!("[Generation] Generation failed: {}", err);
    let message = match &err.code {
        ErrorCode::ModelUnavailable => {
            "The AI model is temporarily unavailable. Please try again later."
        }
        ErrorCode::Validation => "Invalid requirements. Please check the entered data.",
        ErrorCode::RateLimit => "Request limit exceeded. Please wait a minute.",
        _ => "Test generation failed. Please try again.",
    };
    ApiError {
        message: message.to_string(),
        ..err
    }
}
