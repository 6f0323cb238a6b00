//! AI-model provider fixtures.

use chrono::{Days, NaiveDate};
use testops_core::coverage::GapPriority;
use testops_core::generation::TestKind;
use testops_core::model::{
    ChatChoice, ChatMessage, ChatRequest, ChatResponse, CompletionChoice, CompletionRequest,
    CompletionResponse, CoverageAdvice, GeneratedCases, ModelInfo, Pricing, StandardsReview,
    TokenUsage, UsageInfo,
};

const UI_TEXT: &str = r#"Generated UI tests for the requirements:

1. **Check the "Add service" button**
   - Description: the main add-service button is available and works
   - Steps:
     1. Open the calculator main page
     2. Find the "Add service" button
     3. Make sure the button is visible and enabled
     4. Click the button
   - Expected result: the product catalogue opens
   - Priority: CRITICAL
   - Labels: [ui, calculator, critical-path]

2. **Dynamic price calculation**
   - Description: the price updates when the configuration changes
   - Steps:
     1. Add the Compute service
     2. Change CPU count from 2 to 4
     3. Change RAM from 4GB to 8GB
     4. Select an SSD disk instead of HDD
   - Expected result: the price is recalculated after every change
   - Priority: NORMAL
   - Labels: [ui, calculator, price-calculation]"#;

const API_TEXT: &str = r#"Generated API tests for the requirements:

1. **CRUD operations for virtual machines**
   - Description: full create, read, update and delete cycle of a VM
   - Steps:
     1. POST /vms - create a virtual machine
     2. GET /vms/{id} - read the VM
     3. PATCH /vms/{id} - update the VM configuration
     4. DELETE /vms/{id} - delete the virtual machine
   - Expected result: every call succeeds with the right status code
   - Priority: CRITICAL
   - Labels: [api, compute, crud]

2. **Disk management**
   - Description: VM disk operations
   - Steps:
     1. GET /disks - list disks
     2. POST /disks - create a disk
     3. POST /disks/{id}/attach - attach the disk to a VM
     4. POST /disks/{id}/detach - detach the disk
   - Expected result: disks are created and managed correctly
   - Priority: NORMAL
   - Labels: [api, compute, storage]"#;

/// Deterministic stand-in for model output, keyed on the prompt's topic.
pub fn mock_text(prompt: &str) -> String {
    let lower = prompt.to_lowercase();
    if prompt.contains("UI") || lower.contains("interface") {
        UI_TEXT.to_string()
    } else if prompt.contains("API") || lower.contains("endpoint") {
        API_TEXT.to_string()
    } else {
        format!(
            "Generated content for the prompt:\n\n{prompt}\n\n\
             This is a demonstration response. Configure a Cloud.ru API key to \
             get answers from the Evolution Foundation Model."
        )
    }
}

pub fn completion(request: &CompletionRequest, now_secs: i64) -> CompletionResponse {
    let text = mock_text(&request.prompt);
    CompletionResponse {
        id: format!("mock-{now_secs}"),
        usage: TokenUsage::estimate(request.prompt.chars().count(), text.chars().count()),
        choices: vec![CompletionChoice {
            text,
            index: 0,
            finish_reason: "stop".to_string(),
        }],
        created: now_secs,
        model: request.model_or_default().to_string(),
    }
}

/// Answers the last message of the conversation.
pub fn chat(request: &ChatRequest, now_secs: i64) -> ChatResponse {
    let content = mock_text(request.last_content());
    let prompt_chars: usize = request
        .messages
        .iter()
        .map(|m| m.content.chars().count())
        .sum();
    ChatResponse {
        id: format!("chat-mock-{now_secs}"),
        usage: TokenUsage::estimate(prompt_chars, content.chars().count()),
        choices: vec![ChatChoice {
            message: ChatMessage::assistant(content),
            index: 0,
            finish_reason: "stop".to_string(),
        }],
        created: now_secs,
        model: request.model_or_default().to_string(),
    }
}

fn model(
    id: &str,
    name: &str,
    description: &str,
    max_tokens: u32,
    capabilities: &[&str],
    pricing: (f64, f64),
) -> ModelInfo {
    ModelInfo {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        max_tokens,
        capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        pricing: Some(Pricing {
            prompt: pricing.0,
            completion: pricing.1,
        }),
    }
}

pub fn models() -> Vec<ModelInfo> {
    vec![
        model(
            "evolution-foundation-v1",
            "Evolution Foundation v1",
            "Base model for text and code generation",
            4096,
            &["text-generation", "code-generation", "summarization"],
            (0.002, 0.003),
        ),
        model(
            "evolution-code-v1",
            "Evolution Code v1",
            "Model specialised in code generation",
            8192,
            &["code-generation", "code-completion", "code-review"],
            (0.003, 0.005),
        ),
        model(
            "evolution-chat-v1",
            "Evolution Chat v1",
            "Model for dialogue and instructions",
            2048,
            &["chat", "instruction-following", "qa"],
            (0.001, 0.002),
        ),
    ]
}

/// Quota resets thirty days after `today`.
pub fn usage(today: NaiveDate) -> UsageInfo {
    let reset = today.checked_add_days(Days::new(30)).unwrap_or(today);
    UsageInfo {
        used_tokens: 12_500,
        remaining_tokens: 987_500,
        cost: 25.50,
        reset_date: reset.format("%Y-%m-%d").to_string(),
    }
}

pub fn test_cases(requirements: &str, kind: TestKind) -> GeneratedCases {
    let (subject, speed) = match kind {
        TestKind::Ui => ("interface", "interface response time"),
        TestKind::Api => ("API", "API response time"),
    };
    let mut cases = vec![
        format!("Check the core {subject} functionality"),
        "Error handling and edge cases".to_string(),
        format!("Check {speed}"),
        "Input validation".to_string(),
    ];
    match kind {
        TestKind::Ui => {
            cases.push("Responsive layout on different screen sizes".to_string());
            cases.push("Navigation between sections".to_string());
        }
        TestKind::Api => {
            cases.push("Authentication and authorization".to_string());
            cases.push("Pagination and filtering".to_string());
        }
    }
    GeneratedCases {
        test_cases: cases,
        code: Some(code_from_requirements(requirements, kind)),
    }
}

fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Skeleton pytest module embedding the requirements.
pub fn code_from_requirements(requirements: &str, kind: TestKind) -> String {
    let requirements = quoted(requirements);
    match kind {
        TestKind::Ui => format!(
            r#"import allure
import pytest
from playwright.sync_api import Page


@allure.feature("generated-ui-tests")
class TestGeneratedUI:
    """Tests generated from requirements"""

    @allure.title("Requirements check")
    def test_requirements_coverage(self, page: Page):
        with allure.step("Analyse requirements"):
            allure.attach(
                {requirements},
                name="requirements",
                attachment_type=allure.attachment_type.TEXT,
            )

        assert True
"#
        ),
        TestKind::Api => format!(
            r#"import allure
import pytest
import requests

BASE_URL = "https://api.example.com"


@allure.feature("generated-api-tests")
class TestGeneratedAPI:
    """API tests generated from requirements"""

    @allure.title("API functionality check")
    def test_api_functionality(self):
        with allure.step("Prepare test data"):
            test_data = {{
                "requirements": {requirements},
                "test_type": "api",
            }}

        with allure.step("Run the test"):
            response = requests.get(f"{{BASE_URL}}/health")

        with allure.step("Check the result"):
            assert response.status_code == 200
"#
        ),
    }
}

/// Complete Allure test for one test case.
pub fn test_code(test_case: &str, kind: TestKind, framework: &str, today: &str) -> String {
    let (import, fixture, action, checks) = match kind {
        TestKind::Ui => (
            "from playwright.sync_api import Page",
            ", page: Page",
            "page.goto(\"https://example.com\")\n            assert page.title() == \"Example Domain\"",
            "assert page.locator(\"h1\").is_visible()",
        ),
        TestKind::Api => (
            "import requests",
            "",
            "response = requests.get(\"https://api.example.com/health\")\n            assert response.status_code == 200",
            "assert \"status\" in response.json()",
        ),
    };
    let title = quoted(test_case);

    format!(
        r#""""
Generated: {today}
Type: {kind}
Framework: {framework}
"""

import allure
import pytest
{import}


@allure.feature("auto-generated")
@allure.story("auto-generated")
@allure.label("owner", "testops-copilot")
class TestAutoGenerated:

    @allure.title({title})
    @allure.tag("NORMAL")
    def test_auto_generated(self{fixture}):
        with allure.step("Prepare the test environment"):
            test_config = {{"type": "{kind}", "framework": "{framework}"}}

        with allure.step("Run the main test logic"):
            {action}

        with allure.step("Check expected results"):
            {checks}
"#
    )
}

pub fn coverage_advice() -> CoverageAdvice {
    CoverageAdvice {
        recommendations: vec![
            "Review coverage manually and add tests for the missing modules.".to_string(),
        ],
        priority: GapPriority::Medium,
    }
}

pub fn standards_review() -> StandardsReview {
    StandardsReview {
        valid: false,
        issues: vec!["The analysis could not be completed".to_string()],
        suggestions: vec!["Try again later".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testops_core::standards::check_code;

    #[test]
    fn test_mock_text_follows_topic() {
        assert!(mock_text("Generate UI tests").contains("Add service"));
        assert!(mock_text("Generate API tests").contains("POST /vms"));
        assert!(mock_text("hello").contains("hello"));
    }

    #[test]
    fn test_chat_answers_last_message() {
        let request = ChatRequest::new(vec![
            ChatMessage::system("You write tests"),
            ChatMessage::user("Cover the API"),
        ]);
        let response = chat(&request, 1_700_000_000);
        assert!(response.content().contains("CRUD"));
        assert_eq!(response.model, "evolution-foundation-v1");
        assert!(response.usage.total_tokens > 0);
    }

    #[test]
    fn test_usage_reset_date() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(usage(today).reset_date, "2024-02-19");
    }

    #[test]
    fn test_generated_cases_per_kind() {
        let ui = test_cases("open the calculator", TestKind::Ui);
        assert_eq!(ui.test_cases.len(), 6);
        assert!(ui.code.unwrap().contains("\"open the calculator\""));

        let api = test_cases("list vms", TestKind::Api);
        assert!(api.test_cases.contains(&"Pagination and filtering".to_string()));
    }

    #[test]
    fn test_generated_test_code_meets_standards() {
        let code = test_code("List VMs", TestKind::Api, "pytest", "2024-01-20");
        let report = check_code(&code, &[]);
        assert!(report.valid, "{:?}", report.issues);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }
}
