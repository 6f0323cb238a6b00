//! Test plans. Listing is a read path; every mutation propagates.

use testops_core::error::ApiError;
use testops_core::test_plan::{NewTestPlan, PlanRun, TestPlan, TestPlanUpdate};
use tracing::info;

use crate::data_source::{Resolved, SourceResolver};
use crate::fixtures;
use crate::gateway::{ApiCall, ApiGateway};

#[derive(Debug, Clone)]
pub struct TestPlanService {
    gateway: ApiGateway,
    resolver: SourceResolver,
}

impl TestPlanService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver) -> Self {
        Self { gateway, resolver }
    }

    pub async fn list(&self) -> Resolved<Vec<TestPlan>> {
        self.resolver
            .resolve(
                "list_test_plans",
                || self.gateway.request(ApiCall::get("/test-plans")),
                fixtures::plans::test_plans,
            )
            .await
    }

    pub async fn create(&self, plan: &NewTestPlan) -> Result<TestPlan, ApiError> {
        if let Err(err) = plan.validate() {
            return Err(ApiError::validation(err.display_message()));
        }
        let created: TestPlan = self
            .gateway
            .request(ApiCall::post("/test-plans").json(plan)?)
            .await?;
        info!("[TestPlans] Created plan {} ({})", created.name, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: &str, update: &TestPlanUpdate) -> Result<TestPlan, ApiError> {
        self.gateway
            .request(ApiCall::put(plan_path(id)).json(update)?)
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.gateway.send(ApiCall::delete(plan_path(id))).await?;
        info!("[TestPlans] Deleted plan {}", id);
        Ok(())
    }

    pub async fn run(&self, id: &str) -> Result<PlanRun, ApiError> {
        self.gateway
            .request(ApiCall::post(format!("{}/run", plan_path(id))))
            .await
    }
}

fn plan_path(id: &str) -> String {
    format!("/test-plans/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::DataSource;
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use testops_core::error::ErrorCode;
    use testops_core::test_plan::{PlanPriority, PlanStatus};

    fn service(transport: Arc<ScriptedTransport>) -> TestPlanService {
        TestPlanService::new(
            ApiGateway::new("http://localhost:8000/api", transport),
            SourceResolver::default(),
        )
    }

    #[tokio::test]
    async fn test_list_falls_back_to_fixtures() {
        let plans = service(Arc::new(ScriptedTransport::failing())).list().await;
        assert_eq!(plans.source, DataSource::Fixed);
        assert_eq!(plans.value.len(), 6);
    }

    #[tokio::test]
    async fn test_update_sends_only_changed_fields() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::PUT,
            "/test-plans/3",
            Reply::envelope(json!({
                "id": "3", "name": "Regression", "description": "", "product": "calculator",
                "testCases": 10, "coverage": 50, "priority": "low", "status": "active",
                "createdBy": "Anna Sidorova", "createdAt": "2024-01-10", "updatedAt": "2024-01-21"
            })),
        ));
        let update = TestPlanUpdate {
            status: Some(PlanStatus::Active),
            ..Default::default()
        };
        let plan = service(transport.clone()).update("3", &update).await.unwrap();

        assert_eq!(plan.status, PlanStatus::Active);
        let body = transport.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body, json!({"status": "active"}));
    }

    #[tokio::test]
    async fn test_mutations_propagate() {
        let service = service(Arc::new(ScriptedTransport::failing()));
        let plan = NewTestPlan {
            name: "Smoke".into(),
            description: String::new(),
            product: "calculator".into(),
            priority: PlanPriority::High,
        };
        assert!(service.create(&plan).await.unwrap_err().is_network());
        assert!(service.delete("1").await.unwrap_err().is_network());
        assert!(service.run("1").await.unwrap_err().is_network());
    }

    #[tokio::test]
    async fn test_create_validates_locally() {
        let transport = Arc::new(ScriptedTransport::new());
        let plan = NewTestPlan {
            name: " ".into(),
            description: String::new(),
            product: "calculator".into(),
            priority: PlanPriority::Low,
        };
        let err = service(transport.clone()).create(&plan).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_path() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/test-plans/2/run",
            Reply::envelope(json!({"planId": "2", "runId": "run-9", "status": "queued"})),
        ));
        let run = service(transport).run("2").await.unwrap();
        assert_eq!(run.run_id, "run-9");
    }
}
