//! Coverage analysis contracts.
//!
//! [`CoverageSnapshot`] is the only type here with behavior: it owns the
//! `covered <= total` invariant and derives its percentage, so no caller can
//! observe an inconsistent snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::generation::TestKind;

/// Priority of a coverage gap or module.
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
pub enum GapPriority {
    High,
    #[default]
    Medium,
    Low,
}

impl GapPriority {
    /// Priority derived from a module's coverage percentage.
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 90.0 {
            Self::Low
        } else if percentage >= 70.0 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Priority derived from the severity/impact pair the backend reports.
    pub fn from_severity(severity: Option<&str>, impact: Option<&str>) -> Self {
        match (severity, impact) {
            (Some("critical"), _) | (_, Some("high")) => Self::High,
            (Some("medium"), _) | (_, Some("medium")) => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Derived percentage, guarded against an empty total.
pub fn percentage_of(covered: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(covered) / f64::from(total) * 100.0
    }
}

/// Coverage of a single module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleCoverage {
    pub module: String,
    pub total: u32,
    pub covered: u32,
    pub percentage: f64,
    pub priority: GapPriority,
}

impl ModuleCoverage {
    pub fn new(module: impl Into<String>, total: u32, covered: u32) -> Self {
        let covered = covered.min(total);
        let percentage = percentage_of(covered, total);
        Self {
            module: module.into(),
            total,
            covered,
            percentage,
            priority: GapPriority::for_percentage(percentage),
        }
    }
}

/// A described hole in coverage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageGap {
    pub id: String,
    pub module: String,
    pub description: String,
    pub priority: GapPriority,
    #[serde(default)]
    pub affected_endpoints: Vec<String>,
    #[serde(default)]
    pub suggested_tests: Vec<String>,
}

/// A test case suspected to duplicate another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCase {
    pub id: String,
    pub title: String,
    pub duplicate_with: String,
    /// Similarity in percent.
    pub similarity: f64,
    #[serde(rename = "type")]
    pub kind: TestKind,
    pub created: String,
}

/// Aggregate numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageStats {
    pub total: u32,
    pub covered: u32,
    pub percentage: f64,
    /// Change in percentage points since the previous period.
    pub trend: f64,
}

/// Result of one coverage analysis.
///
/// Fields are private so the invariant survives: build with
/// [`CoverageSnapshot::new`] and read through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawSnapshot")]
pub struct CoverageSnapshot {
    total: u32,
    covered: u32,
    percentage: f64,
    #[serde(default)]
    by_module: Vec<ModuleCoverage>,
    #[serde(default)]
    gaps: Vec<CoverageGap>,
    #[serde(default)]
    duplicates: Vec<DuplicateCase>,
    #[serde(default)]
    recommendations: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    total: u32,
    covered: u32,
    #[serde(default)]
    by_module: Vec<ModuleCoverage>,
    #[serde(default)]
    gaps: Vec<CoverageGap>,
    #[serde(default)]
    duplicates: Vec<DuplicateCase>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl From<RawSnapshot> for CoverageSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        Self::new(raw.total, raw.covered)
            .with_modules(raw.by_module)
            .with_gaps(raw.gaps)
            .with_duplicates(raw.duplicates)
            .with_recommendations(raw.recommendations)
    }
}

impl CoverageSnapshot {
    /// Builds a snapshot, clamping `covered` to `total`.
    pub fn new(total: u32, covered: u32) -> Self {
        let covered = covered.min(total);
        Self {
            total,
            covered,
            percentage: percentage_of(covered, total),
            by_module: Vec::new(),
            gaps: Vec::new(),
            duplicates: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn with_modules(mut self, modules: Vec<ModuleCoverage>) -> Self {
        self.by_module = modules;
        self
    }

    pub fn with_gaps(mut self, gaps: Vec<CoverageGap>) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn with_duplicates(mut self, duplicates: Vec<DuplicateCase>) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<String>) -> Self {
        self.recommendations = recommendations;
        self
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn covered(&self) -> u32 {
        self.covered
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    pub fn by_module(&self) -> &[ModuleCoverage] {
        &self.by_module
    }

    pub fn gaps(&self) -> &[CoverageGap] {
        &self.gaps
    }

    pub fn duplicates(&self) -> &[DuplicateCase] {
        &self.duplicates
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }
}

/// Body of `POST /coverage/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub product: String,
    #[serde(default)]
    pub test_cases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_historical: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_code_analysis: Option<bool>,
}

impl AnalysisRequest {
    pub fn for_product(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            test_cases: Vec::new(),
            include_historical: None,
            include_code_analysis: None,
        }
    }

    pub fn with_test_cases(mut self, test_cases: Vec<String>) -> Self {
        self.test_cases = test_cases;
        self
    }
}

/// Per-test complexity scores (0..100, higher is more complex).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexityAnalysis {
    pub complexity_scores: BTreeMap<String, f64>,
    pub suggestions: Vec<String>,
}

/// Per-test execution times in milliseconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionTimeAnalysis {
    pub execution_times: BTreeMap<String, f64>,
    pub slow_tests: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Per-test stability scores (0..100, lower is flakier).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityAnalysis {
    pub stability_scores: BTreeMap<String, f64>,
    pub flaky_tests: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Combined analysis with a weighted overall score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegratedAnalysis {
    pub coverage: CoverageSnapshot,
    pub complexity: ComplexityAnalysis,
    pub execution_time: ExecutionTimeAnalysis,
    pub stability: StabilityAnalysis,
    pub overall_score: u32,
}

fn mean(values: impl ExactSizeIterator<Item = f64>, empty: f64) -> f64 {
    let len = values.len();
    if len == 0 {
        return empty;
    }
    values.sum::<f64>() / len as f64
}

/// Weighted score: coverage 40%, inverse complexity, execution speed and
/// stability 20% each.
pub fn overall_score(
    coverage_percentage: f64,
    complexity: &ComplexityAnalysis,
    execution: &ExecutionTimeAnalysis,
    stability: &StabilityAnalysis,
) -> u32 {
    let complexity_score = 100.0 - mean(complexity.complexity_scores.values().copied(), 50.0);
    let avg_time = mean(execution.execution_times.values().copied(), 2500.0);
    let execution_score = (100.0 - avg_time / 50.0).max(0.0);
    let stability_score = mean(stability.stability_scores.values().copied(), 50.0);

    let score = coverage_percentage * 0.4
        + complexity_score * 0.2
        + execution_score * 0.2
        + stability_score * 0.2;
    score.round().max(0.0) as u32
}

/// Stable pseudo-score in `0..scale` derived from a key (FNV-1a).
///
/// Used wherever a per-test metric has no backend yet, so repeated analyses of
/// the same product agree.
pub fn stable_score(key: &str, salt: &str, scale: f64) -> f64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in salt.bytes().chain(std::iter::once(b':')).chain(key.bytes()) {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % 10_000) as f64 / 10_000.0 * scale
}
