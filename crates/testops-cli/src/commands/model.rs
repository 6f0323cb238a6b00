use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use testops_application::CopilotUseCase;
use testops_core::generation::TestKind;
use testops_core::model::{ChatMessage, ChatRequest, CompletionRequest, EmbeddingInput, EmbeddingRequest};

use super::print_json;

#[derive(Subcommand)]
pub enum ModelAction {
    /// Save the API key and check it against the provider
    SetKey { api_key: String },
    /// Whether the provider answers with the saved key
    Check,
    Models,
    Usage,
    Complete { prompt: String },
    Chat { message: String },
    Embed { text: String },
    /// Test case titles for the given requirements
    Cases {
        requirements: String,
        #[arg(long = "type", default_value = "ui")]
        kind: TestKind,
        #[arg(long)]
        context: Option<String>,
    },
    /// Test source for one test case
    Code {
        test_case: String,
        #[arg(long = "type", default_value = "ui")]
        kind: TestKind,
        #[arg(long, default_value = "pytest")]
        framework: String,
    },
    /// Model review of a test file
    Review {
        file: PathBuf,
        #[arg(long = "standard")]
        standards: Vec<String>,
    },
    /// Local complexity estimate of a test file
    Complexity { file: PathBuf },
    /// Coverage advice for a product
    Advice { product: String },
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub async fn run(app: &CopilotUseCase, action: ModelAction) -> Result<()> {
    match action {
        ModelAction::SetKey { api_key } => {
            app.connect_model(&api_key).await?;
            println!("API key saved");
        }
        ModelAction::Check => {
            let available = app.model_available().await;
            println!("{}", if available { "available" } else { "unavailable" });
        }
        ModelAction::Models => {
            for model in app.available_models().await? {
                println!("{:<28} {:>6} tokens  {}", model.id, model.max_tokens, model.description);
            }
        }
        ModelAction::Usage => print_json(&app.model_usage().await?)?,
        ModelAction::Complete { prompt } => {
            let response = app.complete(&CompletionRequest::new(prompt)).await?;
            println!("{}", response.text());
        }
        ModelAction::Chat { message } => {
            let response = app
                .chat(&ChatRequest::new(vec![ChatMessage::user(message)]))
                .await?;
            println!("{}", response.content());
        }
        ModelAction::Embed { text } => {
            let response = app
                .embeddings(&EmbeddingRequest {
                    input: EmbeddingInput::Single(text),
                    model: None,
                })
                .await?;
            for embedding in &response.data {
                println!("#{}: {} dimensions", embedding.index, embedding.embedding.len());
            }
        }
        ModelAction::Cases {
            requirements,
            kind,
            context,
        } => {
            let generated = app
                .suggest_test_cases(&requirements, kind, context.as_deref())
                .await?;
            for case in &generated.test_cases {
                println!("• {}", case);
            }
            if let Some(code) = generated.code {
                println!("\n{}", code);
            }
        }
        ModelAction::Code {
            test_case,
            kind,
            framework,
        } => println!("{}", app.write_test_code(&test_case, kind, &framework).await?),
        ModelAction::Review { file, standards } => {
            let code = read(&file)?;
            let standards: Vec<&str> = standards.iter().map(String::as_str).collect();
            print_json(&app.review_standards(&code, &standards).await?)?;
        }
        ModelAction::Complexity { file } => {
            print_json(&app.estimate_complexity(&read(&file)?).await)?
        }
        ModelAction::Advice { product } => {
            let coverage = app.analyze_coverage(&product).await;
            let existing: Vec<String> = app
                .state()
                .tests
                .test_cases
                .iter()
                .map(|case| case.title.clone())
                .collect();
            print_json(&app.coverage_advice(&coverage, &existing).await?)?;
        }
    }
    Ok(())
}
