//! Domain services. One typed method per remote operation.

pub mod auth;
pub mod coverage;
pub mod generation;
pub mod gitlab;
pub mod model;
pub mod standards;
pub mod test_plans;

pub use auth::AuthService;
pub use coverage::{CoverageService, ReportFormat};
pub use generation::GenerationService;
pub use gitlab::{GitLabClient, GitLabService};
pub use model::ModelService;
pub use standards::StandardsService;
pub use test_plans::TestPlanService;

use crate::data_source::SourceResolver;
use crate::gateway::ApiGateway;

/// Every service, sharing one gateway and one source strategy.
#[derive(Debug, Clone)]
pub struct Services {
    pub auth: AuthService,
    pub generation: GenerationService,
    pub coverage: CoverageService,
    pub standards: StandardsService,
    pub test_plans: TestPlanService,
    pub gitlab: GitLabService,
    pub model: ModelService,
}

impl Services {
    pub fn new(
        gateway: ApiGateway,
        resolver: SourceResolver,
        model_base_url: impl Into<String>,
        model_api_key: Option<String>,
    ) -> Self {
        Self {
            auth: AuthService::new(gateway.clone()),
            generation: GenerationService::new(gateway.clone(), resolver),
            coverage: CoverageService::new(gateway.clone(), resolver),
            standards: StandardsService::new(gateway.clone(), resolver),
            test_plans: TestPlanService::new(gateway.clone(), resolver),
            gitlab: GitLabService::new(gateway.clone(), resolver),
            model: ModelService::new(gateway, resolver, model_base_url).with_api_key(model_api_key),
        }
    }
}
