use testops_core::generation::TestCase;

use super::super::action::TestsAction;
use super::super::state::TestsState;

pub fn reduce(tests: &mut TestsState, action: TestsAction) {
    match action {
        TestsAction::GenerationFulfilled {
            request,
            result,
            now,
        } => {
            tests.test_cases.extend(
                result
                    .test_cases
                    .iter()
                    .map(|summary| TestCase::from_summary(summary, &request, &result.code, &now)),
            );
            tests.warnings = result.warnings.unwrap_or_default();
            tests.generated_code = Some(result.code);
        }
        TestsAction::CoverageFulfilled(snapshot) => {
            tests.coverage = Some(snapshot);
        }
        TestsAction::DuplicatesFulfilled(duplicates) => {
            tests.duplicates = duplicates;
        }
        TestsAction::ValidationFulfilled { code, report } => {
            tests.checked_code = Some(code);
            tests.validation = Some(report);
        }
        TestsAction::CodeFixed(code) => {
            // The old report describes source that no longer exists.
            tests.checked_code = Some(code);
            tests.validation = None;
        }
        TestsAction::PlansFulfilled(plans) => {
            tests.test_plans = plans;
        }
        TestsAction::PlanSaved(plan) => {
            match tests.test_plans.iter_mut().find(|p| p.id == plan.id) {
                Some(existing) => *existing = plan,
                None => tests.test_plans.push(plan),
            }
        }
        TestsAction::PlanRemoved(id) => {
            tests.test_plans.retain(|p| p.id != id);
        }
        TestsAction::UpdateTestCase(case) => {
            if let Some(existing) = tests.test_cases.iter_mut().find(|c| c.id == case.id) {
                *existing = case;
            }
        }
        TestsAction::DeleteTestCase(id) => {
            tests.test_cases.retain(|c| c.id != id);
        }
        TestsAction::ClearGenerated => {
            tests.generated_code = None;
            tests.warnings.clear();
        }
        TestsAction::Rejected(message) => {
            tests.status.fail(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testops_core::generation::{
        GenerationRequest, GenerationResult, Priority, TestCaseStatus, TestCaseSummary, TestKind,
    };

    fn generation(code: &str, ids: &[&str]) -> TestsAction {
        TestsAction::GenerationFulfilled {
            request: GenerationRequest::new("calculator", TestKind::Ui, "req", Priority::Critical),
            result: GenerationResult {
                code: code.into(),
                test_cases: ids
                    .iter()
                    .map(|id| TestCaseSummary {
                        id: id.to_string(),
                        title: format!("Case {}", id),
                        description: None,
                        steps: None,
                        expected_result: None,
                        priority: None,
                    })
                    .collect(),
                warnings: Some(vec!["slow".into()]),
            },
            now: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_generation_overwrites_code_and_appends_cases() {
        let mut tests = TestsState::default();
        reduce(&mut tests, generation("first", &["a", "b"]));
        reduce(&mut tests, generation("second", &["c"]));

        assert_eq!(tests.generated_code.as_deref(), Some("second"));
        let ids: Vec<_> = tests.test_cases.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(tests.test_cases[0].priority, Priority::Critical);
        assert_eq!(tests.warnings, ["slow"]);
    }

    fn local_id(tests: &TestsState, index: usize) -> String {
        tests.test_cases[index].id.clone()
    }

    #[test]
    fn test_update_and_delete_by_id() {
        let mut tests = TestsState::default();
        reduce(&mut tests, generation("code", &["a", "b"]));
        let (a, b) = (local_id(&tests, 0), local_id(&tests, 1));

        let mut case = tests.test_case(&b).cloned().unwrap();
        case.status = TestCaseStatus::Saved;
        reduce(&mut tests, TestsAction::UpdateTestCase(case));
        assert_eq!(tests.test_case(&b).unwrap().status, TestCaseStatus::Saved);

        reduce(&mut tests, TestsAction::DeleteTestCase(a.clone()));
        assert_eq!(tests.test_cases.len(), 1);
        assert!(tests.test_case(&a).is_none());
    }

    #[test]
    fn test_repeated_server_ids_stay_distinct() {
        let mut tests = TestsState::default();
        reduce(&mut tests, generation("first", &["tc-1"]));
        reduce(&mut tests, generation("second", &["tc-1"]));
        let (first, second) = (local_id(&tests, 0), local_id(&tests, 1));
        assert_ne!(first, second);

        let mut case = tests.test_case(&second).cloned().unwrap();
        case.status = TestCaseStatus::Published;
        reduce(&mut tests, TestsAction::UpdateTestCase(case));
        assert_eq!(tests.test_case(&first).unwrap().status, TestCaseStatus::Generated);

        reduce(&mut tests, TestsAction::DeleteTestCase(first));
        assert_eq!(tests.test_cases.len(), 1);
        assert_eq!(tests.test_cases[0].id, second);
        assert_eq!(tests.test_cases[0].source_id, "tc-1");
    }

    #[test]
    fn test_fix_discards_stale_report() {
        let mut tests = TestsState::default();
        reduce(
            &mut tests,
            TestsAction::ValidationFulfilled {
                code: "def test(): pass".into(),
                report: Default::default(),
            },
        );
        assert!(tests.validation.is_some());

        reduce(&mut tests, TestsAction::CodeFixed("fixed".into()));
        assert!(tests.validation.is_none());
        assert_eq!(tests.checked_code.as_deref(), Some("fixed"));
    }
}
