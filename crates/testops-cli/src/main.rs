use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod context;

use commands::{
    coverage::CoverageAction, gitlab::GitLabAction, model::ModelAction, plans::PlanAction,
    settings::ConfigAction,
};

#[derive(Parser)]
#[command(name = "testops")]
#[command(about = "TestOps Copilot - QA automation assistant", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration directory (default: ~/.config/testops)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Never touch the network; reads serve fixed data
    #[arg(long, global = true)]
    offline: bool,

    /// Keep client state in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session token
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and forget the session token
    Logout,
    /// Show session, theme and integrations
    Status,
    /// Generate tests from requirements
    Generate(commands::generate::GenerateArgs),
    /// Coverage analysis
    Coverage {
        #[command(subcommand)]
        action: CoverageAction,
    },
    /// Check a test file against the Allure standards
    Validate {
        file: PathBuf,
        /// Rules to check (default: all)
        #[arg(long = "rule")]
        rules: Vec<String>,
    },
    /// Add missing Allure boilerplate to a test file
    Fix {
        file: PathBuf,
        /// Rewrite the file instead of printing the result
        #[arg(long)]
        write: bool,
    },
    /// Test plan management
    Plans {
        #[command(subcommand)]
        action: PlanAction,
    },
    /// GitLab repository operations
    Gitlab {
        #[command(subcommand)]
        action: GitLabAction,
    },
    /// Cloud.ru model provider
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Toggle between light and dark theme
    Theme,
    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_env("TESTOPS_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let options = context::Options {
        config_dir: cli.config_dir,
        offline: cli.offline,
        ephemeral: cli.ephemeral,
    };

    if let Commands::Config { action } = &cli.command {
        return commands::settings::config(&options, action);
    }

    let app = context::build(&options).await?;
    let result = match cli.command {
        Commands::Login { email, password } => commands::auth::login(&app, email, password).await,
        Commands::Logout => commands::auth::logout(&app).await,
        Commands::Status => commands::settings::status(&app).await,
        Commands::Generate(args) => commands::generate::run(&app, args).await,
        Commands::Coverage { action } => commands::coverage::run(&app, action).await,
        Commands::Validate { file, rules } => commands::standards::validate(&app, &file, &rules).await,
        Commands::Fix { file, write } => commands::standards::fix(&app, &file, write),
        Commands::Plans { action } => commands::plans::run(&app, action).await,
        Commands::Gitlab { action } => commands::gitlab::run(&app, action).await,
        Commands::Model { action } => commands::model::run(&app, action).await,
        Commands::Theme => commands::settings::toggle_theme(&app).await,
        Commands::Config { .. } => Ok(()),
    };

    commands::print_notifications(&app);
    result
}
