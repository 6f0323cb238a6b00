//! Coverage analysis.

use serde::Deserialize;
use strum::{AsRefStr, Display, EnumString};
use testops_core::coverage::{
    AnalysisRequest, CoverageGap, CoverageSnapshot, CoverageStats, DuplicateCase, GapPriority,
    IntegratedAnalysis, overall_score,
};
use testops_core::error::ApiError;
use tracing::{debug, info};

use crate::data_source::{Resolved, SourceResolver};
use crate::fixtures;
use crate::gateway::{ApiCall, ApiGateway};
use crate::transport::ByteStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pdf,
    Html,
    Json,
}

#[derive(Deserialize)]
struct WireTotals {
    total: u32,
    covered: u32,
}

/// Gaps arrive either as bare descriptions or as described objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireGap {
    Text(String),
    Described {
        module: Option<String>,
        description: Option<String>,
        severity: Option<String>,
        impact: Option<String>,
        #[serde(default, rename = "affectedEndpoints")]
        affected_endpoints: Vec<String>,
        #[serde(default, rename = "suggestedTests")]
        suggested_tests: Vec<String>,
    },
}

impl WireGap {
    fn into_gap(self, index: usize) -> CoverageGap {
        let id = format!("gap-{}", index + 1);
        match self {
            Self::Text(description) => CoverageGap {
                id,
                module: "unknown".to_string(),
                description,
                priority: GapPriority::Medium,
                affected_endpoints: Vec::new(),
                suggested_tests: Vec::new(),
            },
            Self::Described {
                module,
                description,
                severity,
                impact,
                affected_endpoints,
                suggested_tests,
            } => CoverageGap {
                id,
                module: module.unwrap_or_else(|| "unknown".to_string()),
                description: description.unwrap_or_else(|| "Not specified".to_string()),
                priority: GapPriority::from_severity(severity.as_deref(), impact.as_deref()),
                affected_endpoints,
                suggested_tests,
            },
        }
    }
}

#[derive(Deserialize)]
struct WireAnalysis {
    coverage: WireTotals,
    #[serde(default)]
    gaps: Vec<WireGap>,
    #[serde(default)]
    duplicates: Vec<DuplicateCase>,
}

#[derive(Deserialize)]
struct GapsPayload {
    #[serde(default)]
    gaps: Vec<CoverageGap>,
}

#[derive(Deserialize)]
struct DuplicatesPayload {
    #[serde(default)]
    duplicates: Vec<DuplicateCase>,
}

#[derive(Deserialize)]
struct RecommendationsPayload {
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CoverageService {
    gateway: ApiGateway,
    resolver: SourceResolver,
}

impl CoverageService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Analyses coverage. The percentage is always derived locally from the
    /// totals so a snapshot can never disagree with itself.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Resolved<CoverageSnapshot> {
        let product = request.product.as_str();
        self.resolver
            .resolve(
                "analyze_coverage",
                || async {
                    let call = ApiCall::post("/coverage/analyze").json(request)?;
                    let wire: WireAnalysis = self.gateway.request(call).await?;
                    Ok(into_snapshot(wire, product))
                },
                || fixtures::coverage::snapshot(product),
            )
            .await
    }

    pub async fn stats(&self, product: &str) -> Resolved<CoverageStats> {
        self.resolver
            .resolve(
                "coverage_stats",
                || {
                    self.gateway
                        .request(ApiCall::get("/coverage/stats").query("product", product))
                },
                fixtures::coverage::stats,
            )
            .await
    }

    pub async fn gaps(&self, product: &str) -> Resolved<Vec<CoverageGap>> {
        self.resolver
            .resolve(
                "coverage_gaps",
                || async {
                    let call = ApiCall::get("/coverage/gaps").query("product", product);
                    let payload: GapsPayload = self.gateway.request(call).await?;
                    Ok(payload.gaps)
                },
                || fixtures::coverage::gaps(product),
            )
            .await
    }

    pub async fn duplicates(&self, product: &str) -> Resolved<Vec<DuplicateCase>> {
        self.resolver
            .resolve(
                "coverage_duplicates",
                || async {
                    let call = ApiCall::get("/coverage/duplicates").query("product", product);
                    let payload: DuplicatesPayload = self.gateway.request(call).await?;
                    Ok(payload.duplicates)
                },
                fixtures::coverage::duplicates,
            )
            .await
    }

    pub async fn recommendations(&self, product: &str) -> Resolved<Vec<String>> {
        self.resolver
            .resolve(
                "coverage_recommendations",
                || async {
                    let call = ApiCall::get("/coverage/recommendations").query("product", product);
                    let payload: RecommendationsPayload = self.gateway.request(call).await?;
                    Ok(payload.recommendations)
                },
                fixtures::coverage::recommendations,
            )
            .await
    }

    /// Coverage plus per-test complexity, execution time and stability,
    /// folded into a weighted overall score.
    pub async fn integrated_analysis(&self, product: &str) -> IntegratedAnalysis {
        let request = AnalysisRequest::for_product(product);
        let coverage = self.analyze(&request).await.value;
        let test_cases = fixtures::coverage::test_cases_for_product(product);

        let complexity = fixtures::coverage::complexity(&test_cases);
        let execution_time = fixtures::coverage::execution_time(&test_cases);
        let stability = fixtures::coverage::stability(&test_cases);
        let score = overall_score(coverage.percentage(), &complexity, &execution_time, &stability);
        info!("[Coverage] Integrated analysis of {}: score {}", product, score);

        IntegratedAnalysis {
            coverage,
            complexity,
            execution_time,
            stability,
            overall_score: score,
        }
    }

    /// Streams the exported report. Export is a write-side call and fails
    /// loudly.
    pub async fn export_report(
        &self,
        product: &str,
        format: ReportFormat,
    ) -> Result<ByteStream, ApiError> {
        debug!("[Coverage] Exporting {} report for {}", format, product);
        self.gateway
            .stream(
                ApiCall::get("/coverage/export")
                    .query("product", product)
                    .query("format", format),
            )
            .await
    }
}

fn into_snapshot(wire: WireAnalysis, product: &str) -> CoverageSnapshot {
    let gaps = wire
        .gaps
        .into_iter()
        .enumerate()
        .map(|(index, gap)| gap.into_gap(index))
        .collect();
    CoverageSnapshot::new(wire.coverage.total, wire.coverage.covered)
        .with_modules(fixtures::coverage::module_coverage(product))
        .with_gaps(gaps)
        .with_duplicates(wire.duplicates)
}
