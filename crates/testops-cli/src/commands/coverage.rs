use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use futures::StreamExt;
use testops_application::CopilotUseCase;
use testops_interaction::services::ReportFormat;
use tokio::io::AsyncWriteExt;

use super::print_json;

#[derive(Subcommand)]
pub enum CoverageAction {
    /// Coverage snapshot with per-module breakdown
    Analyze { product: String },
    /// Dashboard totals
    Stats { product: String },
    Gaps { product: String },
    Duplicates { product: String },
    Recommendations { product: String },
    /// Complexity, execution time and stability combined
    Report { product: String },
    /// Download the coverage report
    Export {
        product: String,
        #[arg(long, default_value = "pdf")]
        format: ReportFormat,
        #[arg(long, short)]
        output: PathBuf,
    },
}

pub async fn run(app: &CopilotUseCase, action: CoverageAction) -> Result<()> {
    match action {
        CoverageAction::Analyze { product } => {
            let snapshot = app.analyze_coverage(&product).await;
            println!(
                "{}: {}/{} covered ({:.1}%)",
                product,
                snapshot.covered(),
                snapshot.total(),
                snapshot.percentage()
            );
            for module in snapshot.by_module() {
                println!(
                    "  {:<28} {:>3}/{:<3} {:>5.1}%  {}",
                    module.module, module.covered, module.total, module.percentage, module.priority
                );
            }
        }
        CoverageAction::Stats { product } => print_json(&app.coverage_stats(&product).await)?,
        CoverageAction::Gaps { product } => {
            for gap in app.coverage_gaps(&product).await {
                println!("[{}] {} - {}", gap.priority, gap.module, gap.description);
            }
        }
        CoverageAction::Duplicates { product } => {
            for duplicate in app.find_duplicates(&product).await {
                println!(
                    "{} ~ {} ({:.0}%) {}",
                    duplicate.id, duplicate.duplicate_with, duplicate.similarity, duplicate.title
                );
            }
        }
        CoverageAction::Recommendations { product } => {
            for recommendation in app.coverage_recommendations(&product).await {
                println!("• {}", recommendation);
            }
        }
        CoverageAction::Report { product } => {
            print_json(&app.integrated_analysis(&product).await)?
        }
        CoverageAction::Export {
            product,
            format,
            output,
        } => {
            let mut stream = app.export_report(&product, format).await?;
            let mut file = tokio::fs::File::create(&output)
                .await
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let mut written = 0usize;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk.context("Report download interrupted")?;
                written += chunk.len();
                file.write_all(&chunk).await?;
            }
            file.flush().await?;
            println!("Wrote {} bytes to {}", written, output.display());
        }
    }
    Ok(())
}
