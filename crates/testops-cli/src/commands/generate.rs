use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use testops_application::CopilotUseCase;
use testops_core::generation::{GenerationRequest, Priority, TestKind};

#[derive(Args)]
pub struct GenerateArgs {
    /// Product under test (e.g. calculator, evolution-compute)
    product: String,
    /// Requirements text, or @path to read them from a file
    requirements: String,
    #[arg(long = "type", default_value = "ui")]
    kind: TestKind,
    #[arg(long, default_value = "normal")]
    priority: Priority,
    #[arg(long)]
    owner: Option<String>,
    #[arg(long)]
    feature: Option<String>,
    #[arg(long)]
    story: Option<String>,
    /// OpenAPI document for API tests
    #[arg(long)]
    openapi: Option<PathBuf>,
    #[arg(long)]
    endpoint: Option<String>,
    /// Write the generated code here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn read_requirements(raw: &str) -> Result<String> {
    match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read requirements from {}", path)),
        None => Ok(raw.to_string()),
    }
}

pub async fn run(app: &CopilotUseCase, args: GenerateArgs) -> Result<()> {
    let requirements = read_requirements(&args.requirements)?;
    let product = args.product;
    let mut request =
        GenerationRequest::new(product.clone(), args.kind, requirements, args.priority);
    if let Some(owner) = args.owner {
        request = request.with_owner(owner);
    }
    if let Some(feature) = args.feature {
        request = request.with_feature(feature);
    }
    if let Some(story) = args.story {
        request = request.with_story(story);
    }
    if let Some(endpoint) = args.endpoint {
        request = request.with_endpoint(endpoint);
    }
    if let Some(path) = args.openapi {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let spec: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("{} is not a JSON document", path.display()))?;
        request = request.with_openapi_spec(spec);
    }

    let result = app.generate_tests(request).await?;
    app.remember_project(&product, &product).await;
    for case in &result.test_cases {
        eprintln!("  • {} {}", case.id, case.title);
    }
    for warning in result.warnings.iter().flatten() {
        eprintln!("  ⚠️  {}", warning);
    }

    match args.output {
        Some(path) => {
            std::fs::write(&path, &result.code)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{}", result.code),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_requirements_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "Add a VM").unwrap();
        let raw = format!("@{}", file.path().display());
        assert_eq!(read_requirements(&raw).unwrap(), "Add a VM");
        assert_eq!(read_requirements("inline").unwrap(), "inline");
    }
}
