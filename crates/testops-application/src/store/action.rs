use std::collections::BTreeMap;

use strum::AsRefStr;
use testops_core::coverage::{CoverageSnapshot, DuplicateCase};
use testops_core::generation::{GenerationRequest, GenerationResult, TestCase};
use testops_core::notification::Notification;
use testops_core::preferences::Theme;
use testops_core::session::Session;
use testops_core::standards::ValidationReport;
use testops_core::test_plan::TestPlan;

use super::state::View;

#[derive(Debug, Clone)]
pub enum Action {
    Auth(AuthAction),
    Tests(TestsAction),
    Ui(UiAction),
    Integrations(IntegrationsAction),
}

impl Action {
    /// Variant name used in logs.
    pub fn label(&self) -> String {
        match self {
            Action::Auth(action) => format!("auth/{}", action.as_ref()),
            Action::Tests(action) => format!("tests/{}", action.as_ref()),
            Action::Ui(action) => format!("ui/{}", action.as_ref()),
            Action::Integrations(action) => format!("integrations/{}", action.as_ref()),
        }
    }
}

#[derive(Debug, Clone, AsRefStr)]
pub enum AuthAction {
    LoginFulfilled(Session),
    LoginRejected(String),
    LoggedOut,
    /// A 401 ended the session.
    SessionExpired,
}

#[derive(Debug, Clone, AsRefStr)]
pub enum TestsAction {
    GenerationFulfilled {
        request: GenerationRequest,
        result: GenerationResult,
        now: String,
    },
    CoverageFulfilled(CoverageSnapshot),
    DuplicatesFulfilled(Vec<DuplicateCase>),
    ValidationFulfilled {
        code: String,
        report: ValidationReport,
    },
    CodeFixed(String),
    PlansFulfilled(Vec<TestPlan>),
    PlanSaved(TestPlan),
    PlanRemoved(String),
    UpdateTestCase(TestCase),
    DeleteTestCase(String),
    ClearGenerated,
    Rejected(String),
}

#[derive(Debug, Clone, AsRefStr)]
pub enum UiAction {
    Notify(Notification),
    Dismiss(String),
    ClearNotifications,
    ToggleTheme,
    SetTheme(Theme),
    ToggleSidebar,
    SetGlobalLoading(bool),
    Navigate(View),
}

#[derive(Debug, Clone, AsRefStr)]
pub enum IntegrationsAction {
    Connected {
        id: String,
        settings: BTreeMap<String, String>,
        now: String,
    },
    Disconnected(String),
    Synced {
        id: String,
        now: String,
    },
    Failed {
        id: String,
        message: String,
    },
}
