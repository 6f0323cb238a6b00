use testops_core::coverage::{
    AnalysisRequest, CoverageGap, CoverageSnapshot, CoverageStats, DuplicateCase,
    IntegratedAnalysis,
};
use testops_core::error::ApiError;
use testops_interaction::services::ReportFormat;
use testops_interaction::transport::ByteStream;

use super::CopilotUseCase;
use crate::store::{Action, Field, TestsAction};

impl CopilotUseCase {
    /// Analyzes coverage of `product`, seeding the request with the titles
    /// of the cases generated so far.
    pub async fn analyze_coverage(&self, product: &str) -> CoverageSnapshot {
        let titles = self.store.select(|state| {
            state
                .tests
                .test_cases
                .iter()
                .map(|case| case.title.clone())
                .collect::<Vec<_>>()
        });
        let request = AnalysisRequest::for_product(product).with_test_cases(titles);

        let ticket = self.store.begin(Field::Coverage);
        let snapshot = self.services.coverage.analyze(&request).await.value;
        self.store.settle(
            ticket,
            Action::Tests(TestsAction::CoverageFulfilled(snapshot.clone())),
        );
        snapshot
    }

    pub async fn find_duplicates(&self, product: &str) -> Vec<DuplicateCase> {
        let ticket = self.store.begin(Field::Duplicates);
        let duplicates = self.services.coverage.duplicates(product).await.value;
        self.store.settle(
            ticket,
            Action::Tests(TestsAction::DuplicatesFulfilled(duplicates.clone())),
        );
        duplicates
    }

    pub async fn coverage_stats(&self, product: &str) -> CoverageStats {
        self.services.coverage.stats(product).await.value
    }

    pub async fn coverage_gaps(&self, product: &str) -> Vec<CoverageGap> {
        self.services.coverage.gaps(product).await.value
    }

    pub async fn coverage_recommendations(&self, product: &str) -> Vec<String> {
        self.services.coverage.recommendations(product).await.value
    }

    pub async fn integrated_analysis(&self, product: &str) -> IntegratedAnalysis {
        self.services.coverage.integrated_analysis(product).await
    }

    pub async fn export_report(
        &self,
        product: &str,
        format: ReportFormat,
    ) -> Result<ByteStream, ApiError> {
        self.services
            .coverage
            .export_report(product, format)
            .await
            .inspect_err(|err| self.report("export_report", err))
    }
}
