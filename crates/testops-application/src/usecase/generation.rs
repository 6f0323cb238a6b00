use testops_core::error::ApiError;
use testops_core::generation::{
    CodeValidation, GenerationRequest, GenerationResult, OptimizationResult, TestCase,
    TestCaseSummary,
};
use testops_core::notification::Notification;

use super::{CopilotUseCase, now};
use crate::store::{Action, Field, TestsAction};

impl CopilotUseCase {
    /// Generates tests. The result overwrites the generated code slot and
    /// its cases are appended to the case list.
    pub async fn generate_tests(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResult, ApiError> {
        let ticket = self.store.begin(Field::GeneratedCode);
        match self.services.generation.generate(request.clone()).await {
            Ok(result) => {
                let count = result.test_cases.len();
                self.store.settle(
                    ticket,
                    Action::Tests(TestsAction::GenerationFulfilled {
                        request,
                        result: result.clone(),
                        now: now(),
                    }),
                );
                self.notify(Notification::success(format!(
                    "Generated {} test case(s)",
                    count
                )));
                Ok(result)
            }
            Err(err) => {
                self.store
                    .settle(ticket, Action::Tests(TestsAction::Rejected(err.message.clone())));
                self.report("generate_tests", &err);
                Err(err)
            }
        }
    }

    /// Runs several generations in one call. Results are returned only.
    pub async fn generate_batch(
        &self,
        requests: Vec<GenerationRequest>,
    ) -> Result<Vec<GenerationResult>, ApiError> {
        self.services
            .generation
            .generate_batch(requests)
            .await
            .inspect_err(|err| self.report("generate_batch", err))
    }

    pub async fn validate_generated(&self, code: &str) -> CodeValidation {
        self.services.generation.validate_code(code).await.value
    }

    pub async fn optimize_tests(&self, test_cases: &[TestCaseSummary]) -> OptimizationResult {
        self.services.generation.optimize(test_cases).await.value
    }

    pub fn update_test_case(&self, test_case: TestCase) {
        self.store
            .dispatch(Action::Tests(TestsAction::UpdateTestCase(test_case)));
    }

    pub fn delete_test_case(&self, id: &str) {
        self.store
            .dispatch(Action::Tests(TestsAction::DeleteTestCase(id.to_string())));
    }

    pub fn clear_generated(&self) {
        self.store.dispatch(Action::Tests(TestsAction::ClearGenerated));
    }
}
