//! Analysis aggregator: drives one full pass over an organization.
//!
//! Repositories and their workflows are fetched concurrently through a
//! shared [`RequestLimiter`]; results are reassembled with
//! `StreamExt::buffered`, which yields in input order, so the report is
//! grouped by repository in data-source order with workflows in data-source
//! order no matter which request finished first.
//!
//! # Failure handling
//!
//! - Organization enumeration failure: fatal.
//! - Per-workflow run/definition fetch failure: logged, the workflow keeps
//!   empty metrics and carries `fetch_error`.
//! - Per-repository workflow listing failure: logged, the repository is
//!   left out of `repositories` and listed in `skipped_repositories`.
//! - Rate-limit rejection: fatal ([`AnalysisError::QuotaExhausted`]).
//! - Cancellation: unfinished units are dropped and the pass is marked
//!   incomplete.

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use warden_types::analysis::{
    AnalysisReport, RepositoryAnalysis, SkippedRepository, WorkflowAnalysis, percentage,
};
use warden_types::config::AuditConfig;
use warden_types::error::DataSourceError;
use warden_types::run::WorkflowDescriptor;

use super::limiter::{DEFAULT_BASE_BACKOFF, RequestLimiter};
use super::{AnalysisError, AnalysisPass};
use crate::classifier::{Thresholds, classify};
use crate::issues::IssueDetector;
use crate::metrics::{StreakPolicy, compute_metrics};
use crate::repository::data_source::DataSource;

/// Outcome of one fetch after error triage.
enum Fetched<T> {
    Ok(T),
    Degraded(DataSourceError),
    Cancelled,
}

/// Sort a data source result into usable, degraded, cancelled, or fatal.
fn triage<T>(result: Result<T, DataSourceError>) -> Result<Fetched<T>, AnalysisError> {
    match result {
        Ok(value) => Ok(Fetched::Ok(value)),
        Err(DataSourceError::Cancelled) => Ok(Fetched::Cancelled),
        Err(e @ DataSourceError::RateLimited { .. }) => Err(AnalysisError::QuotaExhausted(e)),
        Err(e) => Ok(Fetched::Degraded(e)),
    }
}

enum RepositoryOutcome {
    Analyzed {
        analysis: RepositoryAnalysis,
        complete: bool,
    },
    Empty,
    Unlisted(SkippedRepository),
    Cancelled,
}

pub struct Aggregator<D: DataSource> {
    source: D,
    config: AuditConfig,
    thresholds: Thresholds,
    policy: StreakPolicy,
    detector: IssueDetector,
    base_backoff: Duration,
}

impl<D: DataSource> Aggregator<D> {
    /// Build an aggregator with the built-in detection rules.
    pub fn new(source: D, config: AuditConfig) -> Self {
        let policy = if config.cancelled_breaks_streak {
            StreakPolicy::BreakOnNeutral
        } else {
            StreakPolicy::PassThrough
        };
        Self {
            source,
            thresholds: Thresholds::from_config(&config),
            config,
            policy,
            detector: IssueDetector::with_default_rules(),
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }

    pub fn with_detector(mut self, detector: IssueDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    /// Run one pass. Read-only: nothing is persisted here.
    ///
    /// `now` stamps the report and anchors the time window.
    pub async fn run(
        &self,
        now: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<AnalysisPass, AnalysisError> {
        let limiter =
            RequestLimiter::from_config(&self.config, cancel).with_base_backoff(self.base_backoff);
        let organization = self.config.organization.as_str();
        let excluded = &self.config.excluded_repositories;

        self.check_quota(&limiter).await?;

        let listed = limiter
            .call("list_repositories", move || {
                self.source.list_repositories(organization, excluded)
            })
            .await;
        let repositories: Vec<String> = match triage(listed)? {
            Fetched::Ok(repos) => repos
                .into_iter()
                .filter(|r| !excluded.contains(r))
                .collect(),
            Fetched::Cancelled => {
                tracing::warn!(organization, "analysis cancelled before repository enumeration");
                return Ok(AnalysisPass {
                    report: self.build_report(now, 0, Vec::new(), Vec::new()),
                    complete: false,
                });
            }
            Fetched::Degraded(source) => {
                return Err(AnalysisError::Enumeration {
                    organization: organization.to_string(),
                    source,
                });
            }
        };

        let since = now - chrono::Duration::days(i64::from(self.config.time_window_days));
        tracing::info!(
            organization,
            repositories = repositories.len(),
            since = %since,
            "starting analysis pass"
        );

        let outcomes: Vec<RepositoryOutcome> = stream::iter(repositories.iter())
            .map(|repo| self.analyze_repository(&limiter, repo, since))
            .buffered(self.config.max_in_flight_requests.max(1))
            .try_collect()
            .await?;

        let mut complete = true;
        let mut analyzed = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                RepositoryOutcome::Analyzed {
                    analysis,
                    complete: repo_complete,
                } => {
                    complete &= repo_complete;
                    analyzed.push(analysis);
                }
                RepositoryOutcome::Empty => {}
                RepositoryOutcome::Unlisted(repository) => skipped.push(repository),
                RepositoryOutcome::Cancelled => complete = false,
            }
        }

        let report = self.build_report(now, repositories.len() as u32, analyzed, skipped);
        tracing::info!(
            organization,
            repositories = report.total_repositories,
            workflows = report.total_workflows,
            flagged = report.workflows_to_disable,
            success_rate = report.success_rate,
            complete,
            "analysis pass finished"
        );
        Ok(AnalysisPass { report, complete })
    }

    async fn check_quota(&self, limiter: &RequestLimiter) -> Result<(), AnalysisError> {
        match triage(limiter.call("check_quota", move || self.source.check_quota()).await)? {
            Fetched::Ok(quota) if quota.remaining < self.config.quota_safety_margin => {
                tracing::warn!(
                    remaining = quota.remaining,
                    limit = quota.limit,
                    reset_at = %quota.reset_at,
                    margin = self.config.quota_safety_margin,
                    "data source quota below safety margin, continuing"
                );
            }
            Fetched::Ok(quota) => {
                tracing::debug!(remaining = quota.remaining, limit = quota.limit, "quota ok");
            }
            Fetched::Degraded(e) => {
                tracing::warn!(error = %e, "failed to check data source quota");
            }
            Fetched::Cancelled => {}
        }
        Ok(())
    }

    async fn analyze_repository(
        &self,
        limiter: &RequestLimiter,
        repository: &str,
        since: DateTime<Utc>,
    ) -> Result<RepositoryOutcome, AnalysisError> {
        let listed = limiter
            .call("list_workflows", move || self.source.list_workflows(repository))
            .await;
        let workflows = match triage(listed)? {
            Fetched::Ok(workflows) => workflows,
            Fetched::Cancelled => return Ok(RepositoryOutcome::Cancelled),
            Fetched::Degraded(e) => {
                tracing::warn!(repository, error = %e, "failed to list workflows, skipping repository");
                return Ok(RepositoryOutcome::Unlisted(SkippedRepository {
                    repository: repository.to_string(),
                    error: e.to_string(),
                }));
            }
        };
        if workflows.is_empty() {
            tracing::debug!(repository, "no workflows, skipping repository");
            return Ok(RepositoryOutcome::Empty);
        }

        let results: Vec<Option<(WorkflowAnalysis, Option<String>)>> = stream::iter(workflows.iter())
            .map(|workflow| self.analyze_workflow(limiter, repository, workflow, since))
            .buffered(self.config.max_in_flight_requests.max(1))
            .try_collect()
            .await?;

        let total = results.len();
        let finished: Vec<(WorkflowAnalysis, Option<String>)> = results.into_iter().flatten().collect();
        let complete = finished.len() == total;
        if finished.is_empty() {
            return Ok(RepositoryOutcome::Cancelled);
        }

        let definitions: Vec<(String, String)> = finished
            .iter()
            .filter_map(|(analysis, content)| {
                content
                    .as_ref()
                    .map(|c| (analysis.workflow_path.clone(), c.clone()))
            })
            .collect();
        let mut repository_issues = self.detector.detect_repository(repository, &definitions);

        let analyses: Vec<WorkflowAnalysis> = finished
            .into_iter()
            .map(|(mut analysis, _)| {
                if let Some(extra) = repository_issues.remove(&analysis.workflow_path) {
                    analysis.issues.extend(extra);
                }
                analysis
            })
            .collect();

        Ok(RepositoryOutcome::Analyzed {
            analysis: RepositoryAnalysis::new(repository.to_string(), analyses),
            complete,
        })
    }

    /// Returns `None` when cancelled before the workflow finished. The
    /// definition content is handed back for repository-level rules.
    async fn analyze_workflow(
        &self,
        limiter: &RequestLimiter,
        repository: &str,
        workflow: &WorkflowDescriptor,
        since: DateTime<Utc>,
    ) -> Result<Option<(WorkflowAnalysis, Option<String>)>, AnalysisError> {
        let workflow_id = workflow.id;
        let listed = limiter
            .call("list_runs", move || {
                self.source.list_runs(repository, workflow_id, since)
            })
            .await;
        let (runs, fetch_error) = match triage(listed)? {
            Fetched::Ok(runs) => (runs, None),
            Fetched::Cancelled => return Ok(None),
            Fetched::Degraded(e) => {
                tracing::warn!(
                    repository,
                    workflow = %workflow.path,
                    error = %e,
                    "failed to fetch run history, treating as zero runs"
                );
                (Vec::new(), Some(e.to_string()))
            }
        };

        let path = workflow.path.as_str();
        let fetched = limiter
            .call("get_definition_content", move || {
                self.source.get_definition_content(repository, path)
            })
            .await;
        let content = match triage(fetched)? {
            Fetched::Ok(content) => content,
            Fetched::Cancelled => return Ok(None),
            Fetched::Degraded(e) => {
                tracing::warn!(
                    repository,
                    workflow = %workflow.path,
                    error = %e,
                    "failed to fetch workflow definition, skipping issue detection"
                );
                None
            }
        };

        let metrics = compute_metrics(&runs, self.policy);
        let classification = classify(workflow.file_name(), &metrics, &self.thresholds);
        let issues = content
            .as_deref()
            .map(|c| self.detector.detect(repository, &workflow.path, c))
            .unwrap_or_default();

        if classification.should_disable {
            tracing::debug!(
                repository,
                workflow = %workflow.path,
                reasons = ?classification.reasons,
                "workflow flagged"
            );
        }

        let analysis = WorkflowAnalysis {
            repository: repository.to_string(),
            workflow_id: workflow.id,
            workflow_name: workflow.name.clone(),
            workflow_path: workflow.path.clone(),
            remote_state: workflow.state,
            total_runs: metrics.total_runs,
            successful_runs: metrics.successful_runs,
            failed_runs: metrics.failed_runs,
            failure_rate: metrics.failure_rate,
            consecutive_failures: metrics.consecutive_failures,
            last_successful_run: metrics.last_successful_run,
            recent_runs: metrics.recent_runs,
            should_disable: classification.should_disable,
            disable_reasons: classification.reasons,
            issues,
            fetch_error,
        };
        Ok(Some((analysis, content)))
    }

    fn build_report(
        &self,
        now: DateTime<Utc>,
        repositories_scanned: u32,
        repositories: Vec<RepositoryAnalysis>,
        skipped_repositories: Vec<SkippedRepository>,
    ) -> AnalysisReport {
        let workflows = || repositories.iter().flat_map(|r| r.workflows.iter());
        let total_runs: u64 = workflows().map(|w| u64::from(w.total_runs)).sum();
        let total_successes: u64 = workflows().map(|w| u64::from(w.successful_runs)).sum();
        let total_failures: u64 = workflows().map(|w| u64::from(w.failed_runs)).sum();

        AnalysisReport {
            generated_at: now,
            organization: self.config.organization.clone(),
            time_window_days: self.config.time_window_days,
            repositories_scanned,
            total_repositories: repositories.len() as u32,
            total_workflows: repositories.iter().map(|r| r.total_workflows).sum(),
            workflows_to_disable: repositories.iter().map(|r| r.workflows_to_disable).sum(),
            success_rate: percentage(total_successes, total_runs),
            total_runs,
            total_successes,
            total_failures,
            repositories,
            skipped_repositories,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{BTreeSet, HashMap, HashSet};
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use warden_types::error::DataSourceError;
    use warden_types::run::{QuotaStatus, Run, WorkflowDescriptor, WorkflowState};

    use crate::repository::data_source::DataSource;

    pub fn workflow(id: u64, file: &str) -> WorkflowDescriptor {
        WorkflowDescriptor {
            id,
            name: file.trim_end_matches(".yml").to_string(),
            path: format!(".github/workflows/{file}"),
            state: WorkflowState::Active,
        }
    }

    /// Scripted data source. Ignores the exclusion list so callers can check
    /// that exclusions are also applied locally.
    #[derive(Default)]
    pub struct MockDataSource {
        pub repositories: Vec<String>,
        pub workflows: HashMap<String, Vec<WorkflowDescriptor>>,
        pub runs: HashMap<(String, u64), Vec<Run>>,
        pub contents: HashMap<(String, String), String>,
        pub failing_runs: HashSet<(String, u64)>,
        pub failing_workflow_lists: HashSet<String>,
        pub enumeration_error: Option<DataSourceError>,
        pub rate_limited_runs: bool,
        pub quota_remaining: u32,
        /// Transient failures to return from `list_runs` before succeeding.
        pub transient_failures: Mutex<u32>,
        /// Per-repository delay for `list_workflows`.
        pub delays: HashMap<String, Duration>,
        pub run_queries: Mutex<Vec<(String, u64, DateTime<Utc>)>>,
    }

    impl MockDataSource {
        pub fn with_repo(mut self, name: &str, workflows: Vec<WorkflowDescriptor>) -> Self {
            self.repositories.push(name.to_string());
            self.workflows.insert(name.to_string(), workflows);
            self
        }

        pub fn with_runs(mut self, repo: &str, workflow_id: u64, runs: Vec<Run>) -> Self {
            self.runs.insert((repo.to_string(), workflow_id), runs);
            self
        }

        pub fn with_content(mut self, repo: &str, path: &str, content: &str) -> Self {
            self.contents
                .insert((repo.to_string(), path.to_string()), content.to_string());
            self
        }
    }

    impl DataSource for MockDataSource {
        async fn list_repositories(
            &self,
            _organization: &str,
            _exclude: &BTreeSet<String>,
        ) -> Result<Vec<String>, DataSourceError> {
            if let Some(e) = &self.enumeration_error {
                return Err(e.clone());
            }
            Ok(self.repositories.clone())
        }

        async fn list_workflows(&self, repository: &str) -> Result<Vec<WorkflowDescriptor>, DataSourceError> {
            if let Some(delay) = self.delays.get(repository) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing_workflow_lists.contains(repository) {
                return Err(DataSourceError::Unauthorized(format!("{repository}: not accessible")));
            }
            Ok(self.workflows.get(repository).cloned().unwrap_or_default())
        }

        async fn list_runs(
            &self,
            repository: &str,
            workflow_id: u64,
            since: DateTime<Utc>,
        ) -> Result<Vec<Run>, DataSourceError> {
            self.run_queries
                .lock()
                .unwrap()
                .push((repository.to_string(), workflow_id, since));
            if self.rate_limited_runs {
                return Err(DataSourceError::RateLimited { reset_at: None });
            }
            {
                let mut remaining = self.transient_failures.lock().unwrap();
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(DataSourceError::Transient("502 bad gateway".to_string()));
                }
            }
            let key = (repository.to_string(), workflow_id);
            if self.failing_runs.contains(&key) {
                return Err(DataSourceError::NotFound(format!("{repository}/{workflow_id}")));
            }
            Ok(self.runs.get(&key).cloned().unwrap_or_default())
        }

        async fn get_definition_content(
            &self,
            repository: &str,
            path: &str,
        ) -> Result<Option<String>, DataSourceError> {
            Ok(self
                .contents
                .get(&(repository.to_string(), path.to_string()))
                .cloned())
        }

        async fn check_quota(&self) -> Result<QuotaStatus, DataSourceError> {
            Ok(QuotaStatus {
                remaining: self.quota_remaining,
                limit: 5000,
                reset_at: Utc::now(),
            })
        }
    }
}
