//! `disable` and `restore` commands.

use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use warden_core::lifecycle::LifecycleError;
use warden_core::repository::store::{ManifestStore, ReportStore};
use warden_types::analysis::AnalysisReport;
use warden_types::lifecycle::{ActionOutcome, LifecycleSummary, RestoreFilter, WorkflowMatch};

use super::{Confirmation, Decision, Output, truncate};
use crate::state::AppState;

/// Disable every workflow flagged by the latest (or given) report.
pub async fn disable(
    state: &AppState,
    report_path: Option<&Path>,
    confirmation: Confirmation,
    out: Output,
) -> Result<()> {
    let report = load_report(state, report_path).await?;
    let flagged = report.flagged().count();

    if flagged == 0 {
        if out.json {
            let summary = LifecycleSummary::empty(state.config.dry_run);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!();
            println!(
                "  {} No workflows are flagged in the report; nothing to disable.",
                style("✓").green().bold()
            );
            println!();
        }
        return Ok(());
    }

    let prompt = format!(
        "Disable {} workflow(s) flagged in the {} report for {}?",
        style(flagged).red().bold(),
        report.generated_at.format("%Y-%m-%d %H:%M"),
        report.organization
    );
    let Some(dry_run) = resolve_dry_run(confirmation, state.config.dry_run, &prompt, out)? else {
        println!("  Cancelled.");
        return Ok(());
    };

    let summary = state.lifecycle.disable(&report, dry_run, Utc::now()).await?;
    render_summary("disable", &summary, out)
}

/// Build a restore filter from command-line flags.
pub fn restore_filter(
    repo: Option<String>,
    workflow: Option<String>,
    all: bool,
    substring: bool,
) -> RestoreFilter {
    RestoreFilter {
        repository: repo,
        workflow,
        all,
        matching: if substring {
            WorkflowMatch::Substring
        } else {
            WorkflowMatch::Exact
        },
    }
}

/// Restore the disabled workflows matching `filter`.
pub async fn restore(
    state: &AppState,
    filter: &RestoreFilter,
    confirmation: Confirmation,
    out: Output,
) -> Result<()> {
    if filter.is_unbounded() {
        return Err(LifecycleError::MissingRestoreFilter.into());
    }

    let manifest = state
        .lifecycle
        .manifest_store()
        .load()
        .await
        .context("failed to read the disabled-workflow manifest")?;
    let candidates = manifest.matching(filter).len();

    if candidates == 0 {
        if out.json {
            let summary = LifecycleSummary::empty(state.config.dry_run);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!();
            println!(
                "  {} No disabled workflows match; nothing to restore.",
                style("i").blue().bold()
            );
            println!();
        }
        return Ok(());
    }

    let prompt = format!("Restore {} workflow(s)?", style(candidates).cyan().bold());
    let Some(dry_run) = resolve_dry_run(confirmation, state.config.dry_run, &prompt, out)? else {
        println!("  Cancelled.");
        return Ok(());
    };

    let summary = state.lifecycle.restore(filter, dry_run, Utc::now()).await?;
    render_summary("restore", &summary, out)
}

async fn load_report(state: &AppState, path: Option<&Path>) -> Result<AnalysisReport> {
    let report = match path {
        Some(path) => state
            .reports
            .load_from(path)
            .await
            .with_context(|| format!("failed to read report {}", path.display()))?,
        None => state
            .reports
            .load_latest()
            .await
            .context("failed to read the latest report")?,
    };
    match report {
        Some(report) => Ok(report),
        None => bail!("no analysis report found; run `warden analyze` first"),
    }
}

/// `Some(dry_run)` to proceed, `None` when the user declined.
fn resolve_dry_run(
    confirmation: Confirmation,
    default_dry_run: bool,
    prompt: &str,
    out: Output,
) -> Result<Option<bool>> {
    match confirmation.decide(default_dry_run) {
        Decision::Simulate => Ok(Some(true)),
        Decision::Execute => Ok(Some(false)),
        Decision::Ask => {
            if out.json {
                bail!("refusing to change state without confirmation; pass --confirm or --dry-run");
            }
            let confirmed = Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?;
            Ok(confirmed.then_some(false))
        }
    }
}

fn render_summary(verb: &str, summary: &LifecycleSummary, out: Output) -> Result<()> {
    if out.json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Repository").fg(Color::White),
        Cell::new("Workflow").fg(Color::White),
        Cell::new("Outcome").fg(Color::White),
        Cell::new("Detail").fg(Color::White),
    ]);

    for action in &summary.actions {
        let (outcome, detail) = match &action.outcome {
            ActionOutcome::Simulated => (
                Cell::new("would ".to_string() + verb).fg(Color::Blue),
                action.reasons.join("; "),
            ),
            ActionOutcome::Completed => (Cell::new("✓ done").fg(Color::Green), action.reasons.join("; ")),
            ActionOutcome::Skipped { reason } => (Cell::new("○ skipped").fg(Color::DarkGrey), reason.clone()),
            ActionOutcome::Failed { error } => (Cell::new("✗ failed").fg(Color::Red), error.clone()),
        };
        table.add_row(vec![
            Cell::new(&action.repository).fg(Color::Cyan),
            Cell::new(&action.workflow_path),
            outcome,
            Cell::new(truncate(&detail, 80)),
        ]);
    }

    println!();
    println!("{table}");
    println!();

    if summary.dry_run {
        println!(
            "  {} Dry run: no backups, manifest changes, or remote calls were made.",
            style("i").blue().bold()
        );
    } else {
        let skipped = summary.count(|o| matches!(o, ActionOutcome::Skipped { .. }));
        println!(
            "  {} completed, {} failed, {} skipped",
            style(summary.completed()).green().bold(),
            style(summary.failed()).red().bold(),
            skipped
        );
        if summary.manifest_written {
            println!(
                "  {} Manifest updated. Workflow state on GitHub is unchanged until the recorded change is applied.",
                style("i").blue().bold()
            );
        }
    }
    println!();

    Ok(())
}
