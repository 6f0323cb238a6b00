//! Store slices.

use std::collections::VecDeque;

use strum::{AsRefStr, Display, EnumString};
use testops_core::coverage::{CoverageSnapshot, DuplicateCase};
use testops_core::generation::TestCase;
use testops_core::integration::{IntegrationConfig, default_catalog};
use testops_core::notification::{DEFAULT_NOTIFICATION_CAP, Notification};
use testops_core::preferences::Theme;
use testops_core::session::{Session, User};
use testops_core::standards::ValidationReport;
use testops_core::test_plan::TestPlan;

/// Loading/error lifecycle of a slice.
///
/// Overlapping operations are counted, so `loading` only drops once every
/// started operation has settled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestStatus {
    pub loading: bool,
    pub error: Option<String>,
    in_flight: u32,
}

impl RequestStatus {
    pub(crate) fn start(&mut self) {
        self.in_flight += 1;
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn finish(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0;
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }
}

/// Screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum View {
    #[default]
    Login,
    Dashboard,
    Generation,
    Coverage,
    Standards,
    TestPlans,
    Integrations,
    Settings,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    /// Seeded from persistence at startup, before any user is known.
    pub token: Option<String>,
    pub status: RequestStatus,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// The full session, once a login has produced the user profile.
    pub fn session(&self) -> Option<Session> {
        match (&self.user, &self.token) {
            (Some(user), Some(token)) => Some(Session::new(user.clone(), token.clone())),
            _ => None,
        }
    }

    pub(crate) fn clear(&mut self) {
        self.user = None;
        self.token = None;
        self.status.error = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestsState {
    /// Code of the most recent generation. Each generation overwrites it.
    pub generated_code: Option<String>,
    pub warnings: Vec<String>,
    /// Every generated case, in generation order.
    pub test_cases: Vec<TestCase>,
    pub coverage: Option<CoverageSnapshot>,
    pub duplicates: Vec<DuplicateCase>,
    /// Source the current validation report was produced for.
    pub checked_code: Option<String>,
    pub validation: Option<ValidationReport>,
    pub test_plans: Vec<TestPlan>,
    pub status: RequestStatus,
}

impl TestsState {
    pub fn test_case(&self, id: &str) -> Option<&TestCase> {
        self.test_cases.iter().find(|case| case.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub theme: Theme,
    pub sidebar_open: bool,
    pub global_loading: bool,
    pub current_view: View,
    /// Oldest first.
    pub notifications: VecDeque<Notification>,
    pub notification_cap: usize,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            sidebar_open: true,
            global_loading: false,
            current_view: View::default(),
            notifications: VecDeque::new(),
            notification_cap: DEFAULT_NOTIFICATION_CAP,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationsState {
    pub integrations: Vec<IntegrationConfig>,
    pub status: RequestStatus,
}

impl Default for IntegrationsState {
    fn default() -> Self {
        Self {
            integrations: default_catalog(),
            status: RequestStatus::default(),
        }
    }
}

impl IntegrationsState {
    pub fn get(&self, id: &str) -> Option<&IntegrationConfig> {
        self.integrations.iter().find(|i| i.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut IntegrationConfig> {
        self.integrations.iter_mut().find(|i| i.id == id)
    }
}

/// Slice selector used by the lifecycle bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slice {
    Auth,
    Tests,
    Integrations,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub auth: AuthState,
    pub tests: TestsState,
    pub ui: UiState,
    pub integrations: IntegrationsState,
}

impl AppState {
    /// Initial state seeded from persisted client data.
    pub fn seeded(token: Option<String>, theme: Theme, notification_cap: usize) -> Self {
        let mut state = Self::default();
        state.auth.token = token;
        state.ui.theme = theme;
        state.ui.notification_cap = notification_cap.max(1);
        if state.auth.is_authenticated() {
            state.ui.current_view = View::Dashboard;
        }
        state
    }

    pub(crate) fn status_mut(&mut self, slice: Slice) -> &mut RequestStatus {
        match slice {
            Slice::Auth => &mut self.auth.status,
            Slice::Tests => &mut self.tests.status,
            Slice::Integrations => &mut self.integrations.status,
        }
    }
}
