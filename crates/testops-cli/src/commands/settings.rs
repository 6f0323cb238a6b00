use anyhow::{Context, Result, bail};
use clap::Subcommand;
use testops_application::CopilotUseCase;
use testops_infrastructure::AppConfig;

use crate::context::{Options, load_config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config.toml
    Init {
        #[arg(long)]
        force: bool,
    },
}

pub fn config(options: &Options, action: &ConfigAction) -> Result<()> {
    let paths = options.paths();
    match action {
        ConfigAction::Show => {
            let (path, config) = load_config(&paths)?;
            println!("# {}", path.display());
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            let path = paths.config_file()?;
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, AppConfig::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

pub async fn status(app: &CopilotUseCase) -> Result<()> {
    let state = app.state();
    match (&state.auth.user, state.auth.is_authenticated()) {
        (Some(user), _) => println!("Session: {} <{}>", user.name, user.email),
        (None, true) => println!("Session: restored token"),
        (None, false) => println!("Session: signed out"),
    }
    println!("Theme:   {}", state.ui.theme);
    println!(
        "Model:   {}",
        if app.model_configured().await { "configured" } else { "no API key" }
    );
    println!("Integrations:");
    for integration in &state.integrations.integrations {
        println!(
            "  {:<16} {:<13} {}",
            integration.id,
            integration.status(),
            integration.last_sync().unwrap_or("-")
        );
    }
    for project in app.persisted().recent_projects().await {
        println!("Recent:  {} ({})", project.name, project.last_accessed);
    }
    Ok(())
}

pub async fn toggle_theme(app: &CopilotUseCase) -> Result<()> {
    println!("Theme: {}", app.toggle_theme().await);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_show() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = Options {
            config_dir: Some(dir.path().join("testops")),
            offline: true,
            ephemeral: true,
        };
        config(&options, &ConfigAction::Init { force: false }).unwrap();
        assert!(config(&options, &ConfigAction::Init { force: false }).is_err());
        config(&options, &ConfigAction::Init { force: true }).unwrap();

        let (_, loaded) = load_config(&options.paths()).unwrap();
        assert_eq!(loaded.request_timeout_secs, AppConfig::default().request_timeout_secs);
    }
}
