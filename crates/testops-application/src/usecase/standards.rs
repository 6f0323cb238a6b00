use testops_core::standards::{StandardRule, ValidationReport};

use super::CopilotUseCase;
use crate::store::{Action, Field, TestsAction};

impl CopilotUseCase {
    /// Checks `code`; an empty rule list checks every rule.
    pub async fn validate_code(&self, code: &str, rules: &[StandardRule]) -> ValidationReport {
        let ticket = self.store.begin(Field::Validation);
        let report = self.services.standards.validate(code, rules).await.value;
        self.store.settle(
            ticket,
            Action::Tests(TestsAction::ValidationFulfilled {
                code: code.to_string(),
                report: report.clone(),
            }),
        );
        report
    }

    /// Applies the automatic fixes and replaces the checked source.
    pub fn fix_code(&self, code: &str) -> String {
        let fixed = self.services.standards.fix(code);
        self.store
            .dispatch(Action::Tests(TestsAction::CodeFixed(fixed.clone())));
        fixed
    }
}
