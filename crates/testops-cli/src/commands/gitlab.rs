use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use testops_application::CopilotUseCase;
use testops_core::generation::TestKind;
use testops_core::gitlab::{GitLabConnection, LocalTestFile, TestFileSpec};

#[derive(Subcommand)]
pub enum GitLabAction {
    /// Check credentials and mark the integration connected
    Connect {
        url: String,
        #[arg(long)]
        token: String,
        #[arg(long)]
        project_id: String,
        #[arg(long)]
        branch: Option<String>,
    },
    Projects {
        #[arg(long)]
        search: Option<String>,
    },
    Commits {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    Branches,
    /// Create or update local test files in the repository
    Sync {
        files: Vec<PathBuf>,
        /// Repository directory the files go to
        #[arg(long, default_value = "tests")]
        prefix: String,
        #[arg(long, short)]
        message: Option<String>,
    },
    /// Create the test directory layout, README and CI config
    Scaffold {
        files: Vec<PathBuf>,
        #[arg(long, default_value = "tests")]
        base: String,
        #[arg(long = "type", default_value = "ui")]
        kind: TestKind,
    },
    MergeRequest {
        title: String,
        #[arg(long)]
        source: String,
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no file name", path.display()))
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn local_files(files: &[PathBuf], prefix: &str) -> Result<Vec<LocalTestFile>> {
    let prefix = prefix.trim_end_matches('/');
    files
        .iter()
        .map(|path| {
            let name = file_name(path)?;
            Ok(LocalTestFile {
                path: if prefix.is_empty() {
                    name
                } else {
                    format!("{}/{}", prefix, name)
                },
                content: read(path)?,
            })
        })
        .collect()
}

pub async fn run(app: &CopilotUseCase, action: GitLabAction) -> Result<()> {
    match action {
        GitLabAction::Connect {
            url,
            token,
            project_id,
            branch,
        } => {
            let mut connection = GitLabConnection::new(url, token, project_id);
            connection.branch = branch;
            app.connect_gitlab(connection).await?;
            println!("GitLab connection OK");
        }
        GitLabAction::Projects { search } => {
            for project in app.gitlab_projects(search.as_deref()).await? {
                println!("{:>8} {}", project.id, project.path_with_namespace);
            }
        }
        GitLabAction::Commits { limit } => {
            for commit in app.gitlab_commits(limit).await? {
                let short = commit.id.get(..8).unwrap_or(&commit.id);
                println!("{} {} ({})", short, commit.title, commit.author_name);
            }
        }
        GitLabAction::Branches => {
            for branch in app.gitlab_branches().await? {
                println!("{}", branch.name);
            }
        }
        GitLabAction::Sync {
            files,
            prefix,
            message,
        } => {
            let files = local_files(&files, &prefix)?;
            let commits = app.sync_tests(&files, message.as_deref()).await?;
            println!("{} commit(s) pushed", commits.len());
        }
        GitLabAction::Scaffold { files, base, kind } => {
            let tests = files
                .iter()
                .map(|path| {
                    Ok(TestFileSpec {
                        name: file_name(path)?,
                        content: read(path)?,
                        kind,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let commits = app.push_test_structure(&base, &tests).await?;
            println!("{} commit(s) created under {}", commits.len(), base);
        }
        GitLabAction::MergeRequest {
            title,
            source,
            target,
            description,
        } => {
            let mr = app
                .create_merge_request(&title, &source, target.as_deref(), description.as_deref())
                .await?;
            println!("!{} {}", mr.iid, mr.web_url);
        }
    }
    Ok(())
}
