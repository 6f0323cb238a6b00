use std::collections::BTreeMap;

use testops_core::error::{ApiError, ErrorCode};
use testops_core::gitlab::{
    GitLabBranch, GitLabCommit, GitLabConnection, GitLabFile, GitLabProject, LocalTestFile,
    MergeRequest, TestFileSpec,
};
use testops_core::notification::Notification;
use testops_interaction::services::GitLabClient;
use tracing::info;

use super::{CopilotUseCase, now};
use crate::store::{Action, Field, IntegrationsAction};

pub const GITLAB_INTEGRATION_ID: &str = "gitlab";

impl CopilotUseCase {
    /// Stores a GitLab handle for later calls. No request is made.
    pub async fn configure_gitlab(&self, connection: GitLabConnection) -> Result<(), ApiError> {
        let client = self.services.gitlab.configure(connection)?;
        *self.gitlab.write().await = Some(client);
        Ok(())
    }

    /// Configures GitLab and checks the connection, moving the integration
    /// to connected or error.
    pub async fn connect_gitlab(&self, connection: GitLabConnection) -> Result<(), ApiError> {
        let ticket = self.store.begin(Field::Integrations);
        let checked = match self.services.gitlab.configure(connection) {
            Ok(client) => {
                if client.test_connection().await {
                    Ok(client)
                } else {
                    Err(ApiError::new(ErrorCode::GitLab, "Could not connect to GitLab"))
                }
            }
            Err(err) => Err(err),
        };

        match checked {
            Ok(client) => {
                let resolved = client.connection();
                let settings = BTreeMap::from([
                    ("url".to_string(), resolved.url.clone()),
                    ("projectId".to_string(), resolved.project_id.clone()),
                    ("branch".to_string(), resolved.branch.clone()),
                    ("token".to_string(), resolved.token.clone()),
                ]);
                *self.gitlab.write().await = Some(client);
                self.store.settle(
                    ticket,
                    Action::Integrations(IntegrationsAction::Connected {
                        id: GITLAB_INTEGRATION_ID.to_string(),
                        settings,
                        now: now(),
                    }),
                );
                self.notify(Notification::success("GitLab connected"));
                Ok(())
            }
            Err(err) => {
                self.store.settle(
                    ticket,
                    Action::Integrations(IntegrationsAction::Failed {
                        id: GITLAB_INTEGRATION_ID.to_string(),
                        message: err.message.clone(),
                    }),
                );
                self.report("connect_gitlab", &err);
                Err(err)
            }
        }
    }

    pub async fn disconnect_gitlab(&self) {
        *self.gitlab.write().await = None;
        self.disconnect_integration(GITLAB_INTEGRATION_ID);
    }

    /// The configured handle, or `NOT_CONFIGURED`.
    pub async fn gitlab_client(&self) -> Result<GitLabClient, ApiError> {
        self.gitlab
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::not_configured("GitLab is not configured"))
    }

    pub async fn gitlab_projects(&self, search: Option<&str>) -> Result<Vec<GitLabProject>, ApiError> {
        self.gitlab_client().await?.projects(search).await
    }

    pub async fn gitlab_file(&self, path: &str) -> Result<GitLabFile, ApiError> {
        self.gitlab_client().await?.file(path).await
    }

    pub async fn gitlab_commits(&self, limit: u32) -> Result<Vec<GitLabCommit>, ApiError> {
        Ok(self.gitlab_client().await?.commits(limit).await.value)
    }

    pub async fn gitlab_branches(&self) -> Result<Vec<GitLabBranch>, ApiError> {
        Ok(self.gitlab_client().await?.branches().await.value)
    }

    /// Creates or updates each file on the configured branch.
    pub async fn sync_tests(
        &self,
        files: &[LocalTestFile],
        commit_message: Option<&str>,
    ) -> Result<Vec<GitLabCommit>, ApiError> {
        let client = self
            .gitlab_client()
            .await
            .inspect_err(|err| self.report("sync_tests", err))?;
        match client.sync_tests(files, commit_message).await {
            Ok(commits) => {
                self.store.dispatch(Action::Integrations(IntegrationsAction::Synced {
                    id: GITLAB_INTEGRATION_ID.to_string(),
                    now: now(),
                }));
                info!("[GitLab] Synced {} file(s)", commits.len());
                self.notify(Notification::success(format!(
                    "Synced {} file(s) to GitLab",
                    commits.len()
                )));
                Ok(commits)
            }
            Err(err) => {
                self.store.dispatch(Action::Integrations(IntegrationsAction::Failed {
                    id: GITLAB_INTEGRATION_ID.to_string(),
                    message: err.message.clone(),
                }));
                self.report("sync_tests", &err);
                Err(err)
            }
        }
    }

    /// Scaffolds the test directory layout, README and CI config.
    pub async fn push_test_structure(
        &self,
        base_path: &str,
        tests: &[TestFileSpec],
    ) -> Result<Vec<GitLabCommit>, ApiError> {
        let client = self
            .gitlab_client()
            .await
            .inspect_err(|err| self.report("push_test_structure", err))?;
        let generated_on = chrono::Utc::now().date_naive().to_string();
        client
            .create_test_structure(base_path, tests, &generated_on)
            .await
            .inspect(|commits| {
                self.notify(Notification::success(format!(
                    "Created test structure with {} commit(s)",
                    commits.len()
                )))
            })
            .inspect_err(|err| self.report("push_test_structure", err))
    }

    pub async fn create_merge_request(
        &self,
        title: &str,
        source_branch: &str,
        target_branch: Option<&str>,
        description: Option<&str>,
    ) -> Result<MergeRequest, ApiError> {
        let client = self
            .gitlab_client()
            .await
            .inspect_err(|err| self.report("create_merge_request", err))?;
        client
            .create_merge_request(title, source_branch, target_branch, description)
            .await
            .inspect(|mr| {
                self.notify(Notification::success(format!(
                    "Merge request !{} opened",
                    mr.iid
                )))
            })
            .inspect_err(|err| self.report("create_merge_request", err))
    }
}
