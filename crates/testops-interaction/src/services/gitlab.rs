//! GitLab v4 repository sync.
//!
//! Nothing talks to GitLab until [`GitLabService::configure`] has produced a
//! [`GitLabClient`]; the handle carries the resolved connection.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Method, Url};
use testops_core::error::ApiError;
use testops_core::gitlab::{
    FileCommitPayload, FileEncoding, GitLabBranch, GitLabCommit, GitLabConnection, GitLabFile,
    GitLabProject, GitLabUser, LocalTestFile, MergeRequest, MergeRequestPayload,
    ResolvedGitLabConnection, SCAFFOLD_DIRS, TestFileSpec, ci_config, gitlab_error, kind_dir,
    readme_content, test_file_name,
};
use tracing::{debug, info, warn};

use crate::data_source::{Resolved, SourceResolver};
use crate::gateway::{ApiCall, ApiGateway};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const CI_CONFIG_PATH: &str = ".gitlab-ci.yml";

#[derive(Debug, Clone)]
pub struct GitLabService {
    gateway: ApiGateway,
    resolver: SourceResolver,
}

impl GitLabService {
    pub fn new(gateway: ApiGateway, resolver: SourceResolver) -> Self {
        Self { gateway, resolver }
    }

    /// Validates the connection details and returns a configured client.
    pub fn configure(&self, connection: GitLabConnection) -> Result<GitLabClient, ApiError> {
        let connection = connection.resolve()?;
        info!(
            "[GitLab] Configured project {} on {} (branch {})",
            connection.project_id, connection.url, connection.branch
        );
        Ok(GitLabClient {
            gateway: self.gateway.clone(),
            resolver: self.resolver,
            connection,
        })
    }
}

/// A configured GitLab connection.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    gateway: ApiGateway,
    resolver: SourceResolver,
    connection: ResolvedGitLabConnection,
}

impl GitLabClient {
    pub fn connection(&self) -> &ResolvedGitLabConnection {
        &self.connection
    }

    /// `true` when the token is accepted by `/user`.
    pub async fn test_connection(&self) -> bool {
        let result = match self.call(Method::GET, &["user"]) {
            Ok(call) => self.request::<GitLabUser>(call).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(user) => {
                debug!("[GitLab] Connected as {}", user.username);
                true
            }
            Err(err) => {
                warn!("[GitLab] Connection test failed: {}", err);
                false
            }
        }
    }

    pub async fn projects(&self, search: Option<&str>) -> Result<Vec<GitLabProject>, ApiError> {
        let mut call = self.call(Method::GET, &["projects"])?;
        if let Some(search) = search.filter(|s| !s.is_empty()) {
            call = call.query("search", search);
        }
        self.request(call.query("per_page", 100))
            .await
            .map_err(|e| gitlab_error(e, "Failed to fetch projects"))
    }

    /// Reads a file on the configured branch. A missing file keeps its 404
    /// status so callers can tell it apart.
    pub async fn file(&self, path: &str) -> Result<GitLabFile, ApiError> {
        let call = self
            .file_call(Method::GET, path)?
            .query("ref", &self.connection.branch);
        self.request(call)
            .await
            .map_err(|e| gitlab_error(e, &format!("Failed to fetch file {path}")))
    }

    pub async fn create_file(
        &self,
        path: &str,
        content: &str,
        commit_message: Option<&str>,
    ) -> Result<GitLabCommit, ApiError> {
        self.write_file(Method::POST, path, content, commit_message)
            .await
            .map_err(|e| gitlab_error(e, &format!("Failed to create file {path}")))
    }

    pub async fn update_file(
        &self,
        path: &str,
        content: &str,
        commit_message: Option<&str>,
    ) -> Result<GitLabCommit, ApiError> {
        self.write_file(Method::PUT, path, content, commit_message)
            .await
            .map_err(|e| gitlab_error(e, &format!("Failed to save file {path}")))
    }

    /// Latest commits on the configured branch; empty when unavailable.
    pub async fn commits(&self, limit: u32) -> Resolved<Vec<GitLabCommit>> {
        self.resolver
            .resolve(
                "gitlab_commits",
                || async {
                    let call = self
                        .repository_call(Method::GET, &["commits"])?
                        .query("ref_name", &self.connection.branch)
                        .query("per_page", limit);
                    self.request(call).await
                },
                Vec::new,
            )
            .await
    }

    pub async fn branches(&self) -> Resolved<Vec<GitLabBranch>> {
        self.resolver
            .resolve(
                "gitlab_branches",
                || async {
                    self.request(self.repository_call(Method::GET, &["branches"])?)
                        .await
                },
                Vec::new,
            )
            .await
    }

    /// Opens a merge request into `target_branch`, or the configured branch.
    pub async fn create_merge_request(
        &self,
        title: &str,
        source_branch: &str,
        target_branch: Option<&str>,
        description: Option<&str>,
    ) -> Result<MergeRequest, ApiError> {
        let payload = MergeRequestPayload {
            source_branch: source_branch.to_string(),
            target_branch: target_branch
                .unwrap_or(&self.connection.branch)
                .to_string(),
            title: title.to_string(),
            description: description
                .unwrap_or(&self.connection.commit_message)
                .to_string(),
            remove_source_branch: true,
        };
        let call = self
            .call(
                Method::POST,
                &["projects", &self.connection.project_id, "merge_requests"],
            )?
            .json(&payload)?;
        let merge_request: MergeRequest = self
            .request(call)
            .await
            .map_err(|e| gitlab_error(e, "Failed to create merge request"))?;
        info!("[GitLab] Opened merge request !{}", merge_request.iid);
        Ok(merge_request)
    }

    /// Scaffolds the test layout under `base_path`: kind directories, one
    /// file per test, a README and, when missing, the CI configuration.
    ///
    /// Directory markers that already exist are skipped; any other failure
    /// aborts.
    pub async fn create_test_structure(
        &self,
        base_path: &str,
        tests: &[TestFileSpec],
        generated_on: &str,
    ) -> Result<Vec<GitLabCommit>, ApiError> {
        let base_path = base_path.trim_end_matches('/');
        for dir in SCAFFOLD_DIRS {
            let marker = format!("{base_path}/{dir}/.gitkeep");
            let message = format!("Create {dir} directory for tests");
            if let Err(err) = self.create_file(&marker, "", Some(&message)).await {
                debug!("[GitLab] Skipping {}: {}", marker, err);
            }
        }

        let mut commits = Vec::with_capacity(tests.len() + 2);
        for test in tests {
            let path = format!(
                "{base_path}/{}/{}",
                kind_dir(test.kind),
                test_file_name(&test.name)
            );
            let message = format!("Add {} test: {}", test.kind, test.name);
            commits.push(self.create_file(&path, &test.content, Some(&message)).await?);
        }

        let readme = readme_content(tests, generated_on);
        commits.push(
            self.create_file(
                &format!("{base_path}/README.md"),
                &readme,
                Some("Add README with test documentation"),
            )
            .await?,
        );

        if let Some(commit) = self.ensure_ci_config(base_path).await? {
            commits.push(commit);
        }
        info!(
            "[GitLab] Scaffolded {} test file(s) under {}",
            tests.len(),
            base_path
        );
        Ok(commits)
    }

    /// Pushes local files: existing ones are updated, missing ones created.
    pub async fn sync_tests(
        &self,
        files: &[LocalTestFile],
        commit_message: Option<&str>,
    ) -> Result<Vec<GitLabCommit>, ApiError> {
        let mut commits = Vec::with_capacity(files.len());
        for file in files {
            let commit = match self.file(&file.path).await {
                Ok(_) => {
                    let message = commit_message
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Update test: {}", file.path));
                    self.update_file(&file.path, &file.content, Some(&message))
                        .await?
                }
                Err(err) if err.is_not_found() => {
                    let message = commit_message
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("Add new test: {}", file.path));
                    self.create_file(&file.path, &file.content, Some(&message))
                        .await?
                }
                Err(err) => return Err(err),
            };
            commits.push(commit);
        }
        info!("[GitLab] Synced {} file(s)", commits.len());
        Ok(commits)
    }

    async fn ensure_ci_config(&self, base_path: &str) -> Result<Option<GitLabCommit>, ApiError> {
        match self.file(CI_CONFIG_PATH).await {
            Ok(_) => Ok(None),
            Err(err) if err.is_not_found() => self
                .create_file(
                    CI_CONFIG_PATH,
                    &ci_config(base_path),
                    Some("Add GitLab CI/CD configuration for automated testing"),
                )
                .await
                .map(Some),
            Err(err) => Err(err),
        }
    }

    async fn write_file(
        &self,
        method: Method,
        path: &str,
        content: &str,
        commit_message: Option<&str>,
    ) -> Result<GitLabCommit, ApiError> {
        let payload = FileCommitPayload {
            branch: self.connection.branch.clone(),
            content: BASE64.encode(content.as_bytes()),
            encoding: FileEncoding::Base64,
            commit_message: commit_message
                .unwrap_or(&self.connection.commit_message)
                .to_string(),
            author_name: self.connection.author_name.clone(),
            author_email: self.connection.author_email.clone(),
        };
        let call = self.file_call(method, path)?.json(&payload)?;
        self.request(call).await
    }

    async fn request<T: serde::de::DeserializeOwned>(&self, call: ApiCall) -> Result<T, ApiError> {
        self.gateway.request_raw(call).await
    }

    fn file_call(&self, method: Method, path: &str) -> Result<ApiCall, ApiError> {
        self.repository_call(method, &["files", path])
    }

    fn repository_call(&self, method: Method, segments: &[&str]) -> Result<ApiCall, ApiError> {
        let mut all = vec!["projects", self.connection.project_id.as_str(), "repository"];
        all.extend_from_slice(segments);
        self.call(method, &all)
    }

    /// Builds a call under `{url}/api/v4`. Every segment is encoded whole, so
    /// file paths travel as a single segment.
    fn call(&self, method: Method, segments: &[&str]) -> Result<ApiCall, ApiError> {
        let base = format!("{}/api/v4", self.connection.url);
        let mut url = Url::parse(&base).map_err(|e| {
            ApiError::not_configured(format!("Invalid GitLab URL {:?}: {e}", self.connection.url))
        })?;
        url.path_segments_mut()
            .map_err(|_| ApiError::not_configured("GitLab URL cannot carry a path"))?
            .extend(segments);
        Ok(ApiCall::new(method, url.to_string())
            .without_session()
            .header(TOKEN_HEADER, &self.connection.token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Reply, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;
    use testops_core::error::ErrorCode;
    use testops_core::generation::TestKind;

    const FILES: &str = "/api/v4/projects/42/repository/files";

    fn client(transport: Arc<ScriptedTransport>) -> GitLabClient {
        let gateway = ApiGateway::new("http://localhost:8000/api", transport);
        GitLabService::new(gateway, SourceResolver::default())
            .configure(GitLabConnection::new("https://gitlab.example.com/", "glpat-1", "42"))
            .unwrap()
    }

    fn commit_reply(path: &str) -> Reply {
        Reply::json(201, json!({"file_path": path, "branch": "main"}))
    }

    #[test]
    fn test_configure_rejects_missing_details() {
        let gateway = ApiGateway::new("http://localhost:8000/api", Arc::new(ScriptedTransport::new()));
        let err = GitLabService::new(gateway, SourceResolver::default())
            .configure(GitLabConnection::new("", "", "42"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotConfigured);
    }

    #[tokio::test]
    async fn test_create_file_payload_and_headers() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::POST,
            &format!("{FILES}/tests%2Fui%2Ftest_a.py"),
            commit_reply("tests/ui/test_a.py"),
        ));
        let commit = client(transport.clone())
            .create_file("tests/ui/test_a.py", "assert True", None)
            .await
            .unwrap();
        assert_eq!(commit.file_path.as_deref(), Some("tests/ui/test_a.py"));

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.url.host_str(), Some("gitlab.example.com"));
        assert_eq!(sent.header("private-token"), Some("glpat-1"));
        assert!(sent.header("authorization").is_none());
        let body = sent.json_body().unwrap();
        assert_eq!(body["content"], BASE64.encode("assert True"));
        assert_eq!(body["encoding"], "base64");
        assert_eq!(body["branch"], "main");
        assert_eq!(body["author_email"], "testops@cloud.ru");
    }

    #[tokio::test]
    async fn test_create_file_failure_is_typed() {
        let err = client(Arc::new(ScriptedTransport::failing()))
            .create_file("tests/ui/test_a.py", "x", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::GitLab);
        assert!(err.code.is_integration());
    }

    #[tokio::test]
    async fn test_sync_updates_existing_and_creates_missing() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(
                    Method::GET,
                    &format!("{FILES}/tests%2Fold.py"),
                    Reply::json(200, json!({"file_path": "tests/old.py", "content": "", "encoding": "base64"})),
                )
                .on(Method::PUT, &format!("{FILES}/tests%2Fold.py"), commit_reply("tests/old.py"))
                .on(Method::POST, &format!("{FILES}/tests%2Fnew.py"), commit_reply("tests/new.py")),
        );
        let files = vec![
            LocalTestFile { path: "tests/old.py".into(), content: "a".into() },
            LocalTestFile { path: "tests/new.py".into(), content: "b".into() },
        ];
        let commits = client(transport.clone()).sync_tests(&files, None).await.unwrap();

        assert_eq!(commits.len(), 2);
        let update = transport.requests_to(Method::PUT, "tests%2Fold.py");
        assert_eq!(update[0].json_body().unwrap()["commit_message"], "Update test: tests/old.py");
        let create = transport.requests_to(Method::POST, "tests%2Fnew.py");
        assert_eq!(create[0].json_body().unwrap()["commit_message"], "Add new test: tests/new.py");
    }

    #[tokio::test]
    async fn test_sync_stops_on_other_errors() {
        let transport = Arc::new(ScriptedTransport::new().fallback(Reply::status(500)));
        let files = vec![LocalTestFile { path: "a.py".into(), content: String::new() }];
        let err = client(transport).sync_tests(&files, None).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::GitLab);
    }

    #[tokio::test]
    async fn test_structure_scaffold() {
        // Markers fail (already present), everything else is created.
        let transport = Arc::new(
            ScriptedTransport::new()
                .on(Method::POST, ".gitkeep", Reply::json(400, json!({"message": "exists"})))
                .on(Method::POST, "/files/.gitlab-ci.yml", commit_reply(".gitlab-ci.yml"))
                .on(Method::POST, "", commit_reply("tests/file")),
        );
        let tests = vec![TestFileSpec {
            name: "Open Calculator".into(),
            content: "assert True".into(),
            kind: TestKind::Ui,
        }];
        let commits = client(transport.clone())
            .create_test_structure("tests/", &tests, "2024-01-20")
            .await
            .unwrap();

        // test file, README, CI config
        assert_eq!(commits.len(), 3);
        assert_eq!(transport.requests_to(Method::POST, ".gitkeep").len(), 4);
        assert_eq!(
            transport
                .requests_to(Method::POST, "tests%2Fui%2Ftest_open_calculator.py")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_reads_fall_back_to_empty() {
        let client = client(Arc::new(ScriptedTransport::failing()));
        assert!(client.commits(20).await.value.is_empty());
        assert!(client.branches().await.value.is_empty());
        assert!(!client.test_connection().await);
    }

    #[tokio::test]
    async fn test_commit_listing_query() {
        let transport = Arc::new(ScriptedTransport::new().on(
            Method::GET,
            "/repository/commits",
            Reply::json(200, json!([{"id": "abc", "title": "Init"}])),
        ));
        let commits = client(transport.clone()).commits(5).await.value;
        assert_eq!(commits[0].id, "abc");
        assert_eq!(
            transport.last_request().unwrap().url.query(),
            Some("ref_name=main&per_page=5")
        );
    }
}
