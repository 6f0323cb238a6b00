//! Test plan fixtures.

use testops_core::test_plan::{PlanPriority, PlanStatus, TestPlan};

#[allow(clippy::too_many_arguments)]
fn plan(
    id: &str,
    name: &str,
    description: &str,
    product: &str,
    test_cases: u32,
    coverage: f64,
    priority: PlanPriority,
    status: PlanStatus,
    created_by: &str,
    dates: (&str, &str),
) -> TestPlan {
    TestPlan {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        product: product.to_string(),
        test_cases,
        coverage,
        priority,
        status,
        created_by: created_by.to_string(),
        created_at: dates.0.to_string(),
        updated_at: dates.1.to_string(),
    }
}

pub fn test_plans() -> Vec<TestPlan> {
    use PlanPriority::*;
    use PlanStatus::*;

    vec![
        plan(
            "1",
            "Q1 2024 release",
            "Core functionality for the Q1 release",
            "Price calculator",
            156,
            85.0,
            High,
            Active,
            "Ivan Petrov",
            ("2024-01-15", "2024-01-20"),
        ),
        plan(
            "2",
            "Evolution Compute API",
            "Full API test coverage",
            "Evolution Compute",
            89,
            92.0,
            High,
            Active,
            "Anna Sidorova",
            ("2024-01-10", "2024-01-18"),
        ),
        plan(
            "3",
            "Mobile adaptation",
            "Testing on mobile devices",
            "Price calculator",
            45,
            65.0,
            Medium,
            Draft,
            "Ivan Petrov",
            ("2024-01-05", "2024-01-05"),
        ),
        plan(
            "4",
            "Integration tests",
            "Integrations between services",
            "All products",
            78,
            78.0,
            Medium,
            Active,
            "Petr Ivanov",
            ("2024-01-12", "2024-01-19"),
        ),
        plan(
            "5",
            "Regression testing",
            "Critical functionality checks",
            "Price calculator",
            120,
            95.0,
            High,
            Completed,
            "Anna Sidorova",
            ("2023-12-20", "2024-01-10"),
        ),
        plan(
            "6",
            "Security Testing",
            "API security checks",
            "Evolution Compute",
            34,
            45.0,
            Low,
            Draft,
            "Petr Ivanov",
            ("2024-01-08", "2024-01-08"),
        ),
    ]
}
