//! `analyze` command: run one pass and store the report.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use console::style;
use tokio_util::sync::CancellationToken;

use warden_core::analysis::Aggregator;
use warden_core::repository::store::ReportStore;
use warden_infra::GitHubDataSource;
use warden_infra::config::resolve_token;
use warden_types::audit::{AuditAction, AuditLogEntry};

use super::Output;
use super::report::render_report;
use crate::state::AppState;

/// Analyze the configured organization.
///
/// A complete report replaces `reports/latest.json` (and is copied to
/// `output` when given). An interrupted pass is printed but never stored.
pub async fn analyze(
    state: &AppState,
    output: Option<&Path>,
    cancel: CancellationToken,
    out: Output,
) -> Result<()> {
    state.config.validate()?;
    let token = resolve_token()?;
    let source = GitHubDataSource::new(token, &state.config)
        .context("failed to initialise the GitHub client")?;
    let aggregator = Aggregator::new(source, state.config.clone());

    let spinner = out.spinner(format!(
        "Analyzing workflows in {}...",
        state.config.organization
    ));
    let pass = aggregator.run(Utc::now(), cancel).await;
    spinner.finish_and_clear();
    let pass = pass?;
    let report = &pass.report;

    state
        .lifecycle
        .audit()
        .record(
            AuditLogEntry::new(AuditAction::Analyze)
                .detail("organization", report.organization.clone())
                .detail("repositories", report.total_repositories)
                .detail("workflows", report.total_workflows)
                .detail("flagged", report.workflows_to_disable)
                .detail("skipped_repositories", report.skipped_repositories.len())
                .detail("complete", pass.complete),
        )
        .await;

    if pass.complete {
        state
            .reports
            .save(report)
            .await
            .context("failed to store the analysis report")?;
        if let Some(path) = output {
            state
                .reports
                .export(report, path)
                .await
                .with_context(|| format!("failed to write report to {}", path.display()))?;
        }
    } else {
        tracing::warn!("analysis interrupted, partial report not stored");
    }

    if out.json {
        let body = serde_json::json!({
            "complete": pass.complete,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    render_report(report);
    if pass.complete {
        if report.workflows_to_disable > 0 {
            println!(
                "  Review the list above, then run {} or {}.",
                style("warden disable --dry-run").yellow(),
                style("warden disable --confirm").yellow()
            );
        } else {
            println!("  {} Nothing to disable.", style("✓").green().bold());
        }
    } else {
        println!(
            "  {} Analysis was interrupted; this partial report was not stored.",
            style("!").yellow().bold()
        );
    }
    println!();

    Ok(())
}
