//! Test plans.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{Result, TestOpsError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanPriority {
    High,
    Medium,
    Low,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub product: String,
    /// Number of test cases in the plan.
    pub test_cases: u32,
    /// Coverage in percent.
    pub coverage: f64,
    pub priority: PlanPriority,
    pub status: PlanStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TestPlan {
    /// Case-insensitive match on name or description.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
    }
}

/// Body of `POST /test-plans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestPlan {
    pub name: String,
    pub description: String,
    pub product: String,
    pub priority: PlanPriority,
}

impl NewTestPlan {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(TestOpsError::validation("name", "Plan name is required"));
        }
        if self.product.trim().is_empty() {
            return Err(TestOpsError::validation("product", "Product is required"));
        }
        Ok(())
    }
}

/// Body of `PUT /test-plans/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlanUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PlanPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
}

/// Response of `POST /test-plans/{id}/run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRun {
    pub plan_id: String,
    pub run_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_decodes_wire_names() {
        let body = r#"{
            "id": "1", "name": "Q1 release", "description": "Core flows",
            "product": "calculator", "testCases": 156, "coverage": 85,
            "priority": "high", "status": "active", "createdBy": "QA",
            "createdAt": "2024-01-15", "updatedAt": "2024-01-20"
        }"#;
        let plan: TestPlan = serde_json::from_str(body).unwrap();
        assert_eq!(plan.test_cases, 156);
        assert_eq!(plan.status, PlanStatus::Active);
        assert!(plan.matches("core"));
        assert!(!plan.matches("mobile"));
    }

    #[test]
    fn test_update_omits_absent_fields() {
        let update = TestPlanUpdate {
            status: Some(PlanStatus::Completed),
            ..Default::default()
        };
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(value, serde_json::json!({"status": "completed"}));
    }

    #[test]
    fn test_new_plan_requires_name() {
        let plan = NewTestPlan {
            name: " ".into(),
            description: String::new(),
            product: "calculator".into(),
            priority: PlanPriority::Low,
        };
        assert!(plan.validate().unwrap_err().is_validation());
    }
}
