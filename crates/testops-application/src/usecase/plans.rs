use testops_core::error::ApiError;
use testops_core::notification::Notification;
use testops_core::test_plan::{NewTestPlan, PlanRun, TestPlan, TestPlanUpdate};

use super::CopilotUseCase;
use crate::store::{Action, Field, TestsAction};

impl CopilotUseCase {
    pub async fn load_test_plans(&self) -> Vec<TestPlan> {
        let ticket = self.store.begin(Field::TestPlans);
        let plans = self.services.test_plans.list().await.value;
        self.store
            .settle(ticket, Action::Tests(TestsAction::PlansFulfilled(plans.clone())));
        plans
    }

    pub async fn create_test_plan(&self, plan: &NewTestPlan) -> Result<TestPlan, ApiError> {
        let ticket = self.store.begin(Field::TestPlans);
        let result = self.services.test_plans.create(plan).await;
        self.settle_plan(ticket, "create_test_plan", result, "Test plan created")
    }

    pub async fn update_test_plan(
        &self,
        id: &str,
        update: &TestPlanUpdate,
    ) -> Result<TestPlan, ApiError> {
        let ticket = self.store.begin(Field::TestPlans);
        let result = self.services.test_plans.update(id, update).await;
        self.settle_plan(ticket, "update_test_plan", result, "Test plan updated")
    }

    pub async fn delete_test_plan(&self, id: &str) -> Result<(), ApiError> {
        let ticket = self.store.begin(Field::TestPlans);
        match self.services.test_plans.delete(id).await {
            Ok(()) => {
                self.store
                    .settle(ticket, Action::Tests(TestsAction::PlanRemoved(id.to_string())));
                self.notify(Notification::success("Test plan deleted"));
                Ok(())
            }
            Err(err) => {
                self.store
                    .settle(ticket, Action::Tests(TestsAction::Rejected(err.message.clone())));
                self.report("delete_test_plan", &err);
                Err(err)
            }
        }
    }

    pub async fn run_test_plan(&self, id: &str) -> Result<PlanRun, ApiError> {
        match self.services.test_plans.run(id).await {
            Ok(run) => {
                self.notify(Notification::info(format!("Test plan run {} started", run.run_id)));
                Ok(run)
            }
            Err(err) => {
                self.report("run_test_plan", &err);
                Err(err)
            }
        }
    }

    fn settle_plan(
        &self,
        ticket: crate::store::Ticket,
        context: &str,
        result: Result<TestPlan, ApiError>,
        success: &str,
    ) -> Result<TestPlan, ApiError> {
        match result {
            Ok(plan) => {
                self.store
                    .settle(ticket, Action::Tests(TestsAction::PlanSaved(plan.clone())));
                self.notify(Notification::success(success));
                Ok(plan)
            }
            Err(err) => {
                self.store
                    .settle(ticket, Action::Tests(TestsAction::Rejected(err.message.clone())));
                self.report(context, &err);
                Err(err)
            }
        }
    }
}
