use std::path::Path;

use anyhow::{Context, Result};
use testops_application::CopilotUseCase;
use testops_core::standards::StandardRule;

fn read(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn parse_rules(rules: &[String]) -> Result<Vec<StandardRule>> {
    rules
        .iter()
        .map(|rule| {
            rule.parse::<StandardRule>()
                .with_context(|| format!("Unknown rule {:?}", rule))
        })
        .collect()
}

pub async fn validate(app: &CopilotUseCase, file: &Path, rules: &[String]) -> Result<()> {
    let code = read(file)?;
    let rules = parse_rules(rules)?;
    let report = app.validate_code(&code, &rules).await;

    for issue in &report.issues {
        println!(
            "{}:{}:{} {} [{}] {}",
            file.display(),
            issue.line,
            issue.column,
            issue.severity,
            issue.rule,
            issue.message
        );
    }
    if report.valid {
        println!("✓ {} follows the standards", file.display());
    } else {
        println!("✗ {} has {} issue(s)", file.display(), report.issues.len());
        for suggestion in &report.suggestions {
            println!("  → {}", suggestion);
        }
    }
    Ok(())
}

pub fn fix(app: &CopilotUseCase, file: &Path, write: bool) -> Result<()> {
    let fixed = app.fix_code(&read(file)?);
    if write {
        std::fs::write(file, &fixed)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        println!("Fixed {}", file.display());
    } else {
        print!("{}", fixed);
    }
    Ok(())
}
