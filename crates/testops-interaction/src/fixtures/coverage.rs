//! Coverage analysis fixtures.

use testops_core::coverage::{
    ComplexityAnalysis, CoverageGap, CoverageSnapshot, CoverageStats, DuplicateCase,
    ExecutionTimeAnalysis, GapPriority, ModuleCoverage, StabilityAnalysis, stable_score,
};
use testops_core::generation::TestKind;

pub const MODULES: [&str; 5] = [
    "calculator-ui",
    "calculator-api",
    "compute-vms",
    "compute-disks",
    "compute-flavors",
];

/// Test cases analysed per product by the integrated analysis.
pub const CASES_PER_PRODUCT: usize = 20;

pub const COMPLEX_THRESHOLD: f64 = 80.0;
pub const SIMPLE_THRESHOLD: f64 = 20.0;
pub const SLOW_THRESHOLD_MS: f64 = 3000.0;
pub const FLAKY_THRESHOLD: f64 = 60.0;

pub fn snapshot(product: &str) -> CoverageSnapshot {
    CoverageSnapshot::new(100, 65)
        .with_modules(module_coverage(product))
        .with_gaps(gaps(product))
        .with_duplicates(duplicates())
        .with_recommendations(recommendations())
}

pub fn stats() -> CoverageStats {
    CoverageStats {
        total: 100,
        covered: 65,
        percentage: 65.0,
        trend: 5.2,
    }
}

/// Per-module breakdown: 60..100% coverage over 20..70 cases.
pub fn module_coverage(product: &str) -> Vec<ModuleCoverage> {
    MODULES
        .iter()
        .map(|module| {
            let percentage = 60.0 + stable_score(module, product, 40.0).floor();
            let total = 20 + stable_score(module, &format!("{product}:total"), 50.0) as u32;
            let covered = (f64::from(total) * percentage / 100.0).floor() as u32;
            ModuleCoverage::new(*module, total, covered)
        })
        .collect()
}

fn gap(
    id: &str,
    module: &str,
    description: &str,
    priority: GapPriority,
    endpoints: &[&str],
    tests: &[&str],
) -> CoverageGap {
    CoverageGap {
        id: id.to_string(),
        module: module.to_string(),
        description: description.to_string(),
        priority,
        affected_endpoints: endpoints.iter().map(|s| s.to_string()).collect(),
        suggested_tests: tests.iter().map(|s| s.to_string()).collect(),
    }
}

/// Known gaps of the demo products. Unknown products have none.
pub fn gaps(product: &str) -> Vec<CoverageGap> {
    match product {
        "calculator" => vec![
            gap(
                "gap-1",
                "calculator-ui",
                "No tests for the configuration comparison mode",
                GapPriority::High,
                &["/calculator/compare"],
                &["test_comparison_mode", "test_comparison_export"],
            ),
            gap(
                "gap-2",
                "calculator-mobile",
                "Tablet layouts (768px) are not covered",
                GapPriority::Medium,
                &[],
                &["test_tablet_responsive", "test_tablet_navigation"],
            ),
        ],
        "evolution-compute" => vec![
            gap(
                "gap-3",
                "compute-api",
                "No tests for VM statuses (migrating, resizing)",
                GapPriority::High,
                &["/vms/{id}/status", "/vms/{id}/actions"],
                &["test_vm_status_transitions", "test_vm_resize_operation"],
            ),
            gap(
                "gap-4",
                "compute-disks",
                "No tests for snapshot operations",
                GapPriority::Medium,
                &["/disks/{id}/snapshots"],
                &["test_disk_snapshot_create", "test_disk_snapshot_restore"],
            ),
        ],
        _ => Vec::new(),
    }
}

pub fn duplicates() -> Vec<DuplicateCase> {
    let dup = |id: &str, title: &str, with: &str, similarity: f64, kind, created: &str| {
        DuplicateCase {
            id: id.to_string(),
            title: title.to_string(),
            duplicate_with: with.to_string(),
            similarity,
            kind,
            created: created.to_string(),
        }
    };
    vec![
        dup(
            "dup-1",
            "Check the \"Add service\" button",
            "TC-001",
            95.0,
            TestKind::Ui,
            "2024-01-15",
        ),
        dup("dup-2", "Login form test", "TC-045", 88.0, TestKind::Ui, "2024-01-10"),
        dup("dup-3", "API: GET /vms", "TC-102", 92.0, TestKind::Api, "2024-01-12"),
    ]
}

pub fn recommendations() -> Vec<String> {
    [
        "Merge the duplicated tests TC-001 and TC-045",
        "Add tests for mobile resolutions",
        "Optimize long-running tests (>3 seconds)",
        "Add edge-case handling for API endpoints",
        "Increase coverage of the \"calculator-mobile\" module",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn test_cases_for_product(product: &str) -> Vec<String> {
    (1..=CASES_PER_PRODUCT)
        .map(|i| format!("TC-{product}-{i}"))
        .collect()
}

pub fn complexity(test_cases: &[String]) -> ComplexityAnalysis {
    let mut analysis = ComplexityAnalysis::default();
    for id in test_cases {
        let score = stable_score(id, "complexity", 100.0);
        analysis.complexity_scores.insert(id.clone(), score);
        if score > COMPLEX_THRESHOLD {
            analysis.suggestions.push(format!(
                "Test {id} is highly complex. Consider splitting it into several tests."
            ));
        } else if score < SIMPLE_THRESHOLD {
            analysis.suggestions.push(format!(
                "Test {id} is very simple. Consider merging it with related tests."
            ));
        }
    }
    analysis
}

pub fn execution_time(test_cases: &[String]) -> ExecutionTimeAnalysis {
    let mut analysis = ExecutionTimeAnalysis::default();
    for id in test_cases {
        let millis = stable_score(id, "execution", 5000.0);
        analysis.execution_times.insert(id.clone(), millis);
        if millis > SLOW_THRESHOLD_MS {
            analysis.slow_tests.push(id.clone());
            analysis.suggestions.push(format!(
                "Test {id} is slow ({millis:.0}ms). Consider optimizing it."
            ));
        }
    }
    analysis
}

pub fn stability(test_cases: &[String]) -> StabilityAnalysis {
    let mut analysis = StabilityAnalysis::default();
    for id in test_cases {
        let score = stable_score(id, "stability", 100.0);
        analysis.stability_scores.insert(id.clone(), score);
        if score < FLAKY_THRESHOLD {
            analysis.flaky_tests.push(id.clone());
            analysis.suggestions.push(format!(
                "Test {id} is unstable (score: {score:.1}). Needs investigation."
            ));
        }
    }
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_shape() {
        let snapshot = snapshot("calculator");
        assert_eq!(snapshot.total(), 100);
        assert_eq!(snapshot.covered(), 65);
        assert_eq!(snapshot.percentage(), 65.0);
        assert_eq!(snapshot.by_module().len(), MODULES.len());
        assert_eq!(snapshot.gaps().len(), 2);
        assert_eq!(snapshot.duplicates().len(), 3);
        assert_eq!(snapshot.recommendations().len(), 5);
    }

    #[test]
    fn test_module_coverage_is_deterministic_and_bounded() {
        let first = module_coverage("calculator");
        assert_eq!(first, module_coverage("calculator"));
        for module in &first {
            assert!((20..70).contains(&module.total));
            assert!(module.covered <= module.total);
            assert!(module.percentage >= 55.0, "{module:?}");
        }
    }

    #[test]
    fn test_gaps_per_product() {
        let ids: Vec<_> = gaps("evolution-compute").into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["gap-3", "gap-4"]);
        assert!(gaps("unknown").is_empty());
    }

    #[test]
    fn test_per_case_analyses_agree_with_thresholds() {
        let cases = test_cases_for_product("calculator");
        assert_eq!(cases.len(), 20);
        assert_eq!(cases[0], "TC-calculator-1");

        let timing = execution_time(&cases);
        assert_eq!(timing.execution_times.len(), 20);
        for id in &timing.slow_tests {
            assert!(timing.execution_times[id] > SLOW_THRESHOLD_MS);
        }
        assert_eq!(timing.slow_tests.len(), timing.suggestions.len());

        let stable = stability(&cases);
        for id in &stable.flaky_tests {
            assert!(stable.stability_scores[id] < FLAKY_THRESHOLD);
        }
        assert_eq!(complexity(&cases), complexity(&cases));
    }
}
