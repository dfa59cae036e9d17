//! GitHubDataSource -- [`DataSource`] over the GitHub REST API.
//!
//! Paginates every list endpoint, maps HTTP failures onto
//! [`DataSourceError`], and decodes base64 file contents. The token is held
//! as a [`SecretString`] and only exposed when building request headers.

use std::collections::BTreeSet;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use warden_core::repository::data_source::DataSource;
use warden_types::config::AuditConfig;
use warden_types::error::DataSourceError;
use warden_types::run::{QuotaStatus, Run, WorkflowDescriptor};

use super::types::{GitHubContent, GitHubRateLimit, GitHubRepository, GitHubRunList, GitHubWorkflowList};

/// Largest page size the REST API accepts.
const MAX_PAGE_SIZE: usize = 100;

pub struct GitHubDataSource {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
    /// Owner of the repositories passed to the per-repository calls.
    organization: String,
    include_archived: bool,
    max_runs: usize,
    page_size: usize,
    timeout_secs: u64,
}

impl GitHubDataSource {
    const API_VERSION: &'static str = "2022-11-28";

    pub fn new(token: SecretString, config: &AuditConfig) -> Result<Self, DataSourceError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DataSourceError::Invalid(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            organization: config.organization.clone(),
            include_archived: config.include_archived,
            max_runs: config.max_runs_per_workflow as usize,
            page_size: MAX_PAGE_SIZE,
            timeout_secs: config.request_timeout_secs,
        })
    }

    /// Override the page size (capped at 100).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    async fn send(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, DataSourceError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .bearer_auth(self.token.expose_secret())
            .header("accept", "application/vnd.github+json")
            .header("x-github-api-version", Self::API_VERSION)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DataSourceError::Timeout(self.timeout_secs)
                } else {
                    DataSourceError::Transient(format!("request to {path} failed: {e}"))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        let err = classify_status(status, &headers, path, &body);
        tracing::debug!(path, status = status.as_u16(), error = %err, "GitHub request failed");
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, DataSourceError> {
        self.send(path, query)
            .await?
            .json::<T>()
            .await
            .map_err(|e| DataSourceError::Invalid(format!("failed to parse response from {path}: {e}")))
    }

    fn page_query(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![("per_page", self.page_size.to_string()), ("page", page.to_string())]
    }
}

/// Map a non-success response onto a [`DataSourceError`].
///
/// 403 counts as rate limiting only when `x-ratelimit-remaining` is 0;
/// otherwise it is a permissions problem.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, path: &str, body: &str) -> DataSourceError {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let exhausted = header("x-ratelimit-remaining") == Some("0");
    let reset_at = header("x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    match status.as_u16() {
        401 => DataSourceError::Unauthorized(format!("{path}: token rejected")),
        429 => DataSourceError::RateLimited { reset_at },
        403 if exhausted => DataSourceError::RateLimited { reset_at },
        403 => DataSourceError::Unauthorized(format!("{path}: {}", excerpt(body))),
        404 => DataSourceError::NotFound(path.to_string()),
        500..=599 => DataSourceError::Transient(format!("HTTP {status} from {path}")),
        _ => DataSourceError::Invalid(format!("HTTP {status} from {path}: {}", excerpt(body))),
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(200).collect()
}

impl DataSource for GitHubDataSource {
    async fn list_repositories(
        &self,
        organization: &str,
        exclude: &BTreeSet<String>,
    ) -> Result<Vec<String>, DataSourceError> {
        let path = format!("/orgs/{organization}/repos");
        let mut names = Vec::new();
        for page in 1u32.. {
            let mut query = self.page_query(page);
            query.push(("type", "all".to_string()));
            let repos: Vec<GitHubRepository> = self.get_json(&path, &query).await?;
            let fetched = repos.len();
            names.extend(
                repos
                    .into_iter()
                    .filter(|r| self.include_archived || !r.archived)
                    .map(|r| r.name)
                    .filter(|name| !exclude.contains(name)),
            );
            if fetched < self.page_size {
                break;
            }
        }
        tracing::debug!(organization, repositories = names.len(), "listed repositories");
        Ok(names)
    }

    async fn list_workflows(&self, repository: &str) -> Result<Vec<WorkflowDescriptor>, DataSourceError> {
        let path = format!("/repos/{}/{repository}/actions/workflows", self.organization);
        let mut workflows = Vec::new();
        for page in 1u32.. {
            let list: GitHubWorkflowList = self.get_json(&path, &self.page_query(page)).await?;
            let fetched = list.workflows.len();
            workflows.extend(list.workflows.into_iter().map(WorkflowDescriptor::from));
            if fetched < self.page_size || workflows.len() as u64 >= list.total_count {
                break;
            }
        }
        Ok(workflows)
    }

    async fn list_runs(
        &self,
        repository: &str,
        workflow_id: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<Run>, DataSourceError> {
        let path = format!(
            "/repos/{}/{repository}/actions/workflows/{workflow_id}/runs",
            self.organization
        );
        let created = format!(">={}", since.to_rfc3339_opts(SecondsFormat::Secs, true));
        let mut runs: Vec<Run> = Vec::new();
        for page in 1u32.. {
            let mut query = self.page_query(page);
            query.push(("created", created.clone()));
            let list: GitHubRunList = self.get_json(&path, &query).await?;
            let fetched = list.workflow_runs.len();
            runs.extend(list.workflow_runs.into_iter().map(Run::from));
            if fetched < self.page_size
                || runs.len() >= self.max_runs
                || runs.len() as u64 >= list.total_count
            {
                break;
            }
        }
        runs.truncate(self.max_runs);
        Ok(runs)
    }

    async fn get_definition_content(
        &self,
        repository: &str,
        path: &str,
    ) -> Result<Option<String>, DataSourceError> {
        let url_path = format!("/repos/{}/{repository}/contents/{path}", self.organization);
        let content: GitHubContent = match self.get_json(&url_path, &[]).await {
            Ok(content) => content,
            Err(DataSourceError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let Some(raw) = content.content else {
            return Err(DataSourceError::Invalid(format!("{url_path}: response has no content")));
        };
        if content.encoding.as_deref() != Some("base64") {
            return Ok(Some(raw));
        }

        let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| DataSourceError::Invalid(format!("{url_path}: invalid base64: {e}")))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| DataSourceError::Invalid(format!("{url_path}: not UTF-8: {e}")))
    }

    async fn check_quota(&self) -> Result<QuotaStatus, DataSourceError> {
        let limits: GitHubRateLimit = self.get_json("/rate_limit", &[]).await?;
        Ok(limits.resources.core.into())
    }
}
