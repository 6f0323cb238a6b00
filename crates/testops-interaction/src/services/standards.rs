//! Standards validation. The local rule checker is the fixed source.

use testops_core::standards::{StandardRule, StandardsRequest, ValidationReport, auto_fix, check_code};
use tracing::debug;

use crate::data_source::{Resolved, SourceResolver};
use crate::gateway::{ApiCall, ApiGateway};

#[derive(Debug, Clone)]
pub struct StandardsService {
    gateway: ApiGateway,
    resolver: SourceResolver,
}

impl StandardsService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Checks `code` against `rules` (every rule when empty).
    pub async fn validate(&self, code: &str, rules: &[StandardRule]) -> Resolved<ValidationReport> {
        let request = StandardsRequest {
            code: code.to_string(),
            rules: rules.to_vec(),
        };
        self.resolver
            .resolve(
                "validate_standards",
                || async {
                    let call = ApiCall::post("/standards/validate").json(&request)?;
                    self.gateway.request(call).await
                },
                || check_code(code, rules),
            )
            .await
    }

    /// Inserts missing Allure boilerplate. Always local.
    pub fn fix(&self, code: &str) -> String {
        let fixed = auto_fix(code);
        debug!(
            "[Standards] Auto-fix added {} line(s)",
            fixed.lines().count().saturating_sub(code.lines().count())
        );
        fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::DataSource;
    use crate::testing::{Reply, ScriptedTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use testops_core::standards::Severity;

    fn service(transport: Arc<ScriptedTransport>) -> StandardsService {
        StandardsService::new(
            ApiGateway::new("http://localhost:8000/api", transport),
            SourceResolver::default(),
        )
    }

    #[tokio::test]
    async fn test_remote_report_is_used() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            "/standards/validate",
            Reply::envelope(json!({"valid": true, "issues": [], "suggestions": []})),
        ));
        let report = service(transport.clone())
            .validate("def test_x(): pass", &[StandardRule::Steps])
            .await;

        assert_eq!(report.source, DataSource::Remote);
        assert!(report.value.valid);
        let body = transport.last_request().unwrap().json_body().cloned().unwrap();
        assert_eq!(body["rules"], json!(["steps"]));
    }

    #[tokio::test]
    async fn test_local_checker_substitutes() {
        let report = service(Arc::new(ScriptedTransport::failing()))
            .validate("def test_x():\n    pass\n", &[])
            .await;

        assert_eq!(report.source, DataSource::Fixed);
        assert!(!report.value.valid);
        assert_eq!(report.value.issues.len(), 7);
        assert_eq!(report.value.count(Severity::Error), 4);
    }

    #[test]
    fn test_fix_then_recheck_clears_boilerplate_rules() {
        let service = service(Arc::new(ScriptedTransport::new()));
        let fixed = service.fix("def test_x():\n    assert True\n");
        let report = check_code(&fixed, &[StandardRule::AllureImport, StandardRule::OwnerLabel]);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }
}
