//! Analysis report rendering and the `report` command.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use warden_core::repository::store::ReportStore;
use warden_types::analysis::AnalysisReport;

use super::{Output, truncate};
use crate::state::AppState;

/// Show the latest stored report, or the report at `path`.
pub async fn show_report(state: &AppState, path: Option<&Path>, out: Output) -> Result<()> {
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

    let Some(report) = report else {
        if out.json {
            println!("null");
        } else {
            println!();
            println!(
                "  {} No analysis report yet. Create one with: {}",
                style("i").blue().bold(),
                style("warden analyze").yellow()
            );
            println!();
        }
        return Ok(());
    };

    if out.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    render_report(&report);
    Ok(())
}

/// Print a styled summary of `report`: totals, flagged workflows, then
/// advisory issues.
pub fn render_report(report: &AnalysisReport) {
    println!();
    println!(
        "  {} {} · last {} days · generated {}",
        style("⚑").bold(),
        style(&report.organization).cyan().bold(),
        report.time_window_days,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!();
    println!("  {}", style("── Summary ──").dim());
    println!(
        "  Repositories: {} with workflows ({} scanned)",
        style(report.total_repositories).bold(),
        report.repositories_scanned
    );
    println!("  Workflows:    {}", style(report.total_workflows).bold());
    println!(
        "  Runs:         {} ({} succeeded, {} failed)",
        report.total_runs, report.total_successes, report.total_failures
    );
    println!("  Success rate: {}", format_rate(report.success_rate));
    let flagged_label = if report.workflows_to_disable > 0 {
        style(report.workflows_to_disable).red().bold()
    } else {
        style(report.workflows_to_disable).green()
    };
    println!("  To disable:   {flagged_label}");
    println!();

    let flagged: Vec<_> = report.flagged().collect();
    if !flagged.is_empty() {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Repository").fg(Color::White),
            Cell::new("Workflow").fg(Color::White),
            Cell::new("Runs").fg(Color::White),
            Cell::new("Failure rate").fg(Color::White),
            Cell::new("Streak").fg(Color::White),
            Cell::new("Reasons").fg(Color::White),
        ]);
        for wf in &flagged {
            table.add_row(vec![
                Cell::new(&wf.repository).fg(Color::Cyan),
                Cell::new(wf.file_name()),
                Cell::new(wf.total_runs),
                Cell::new(format!("{:.1}%", wf.failure_rate)).fg(Color::Red),
                Cell::new(wf.consecutive_failures),
                Cell::new(wf.disable_reasons.join("; ")),
            ]);
        }
        println!("{table}");
        println!();
    }

    let issues: Vec<_> = report
        .repositories
        .iter()
        .flat_map(|r| r.workflows.iter())
        .flat_map(|wf| wf.issues.iter().map(move |issue| (wf, issue)))
        .collect();
    if !issues.is_empty() {
        println!("  {}", style("── Issues ──").dim());
        for (wf, issue) in &issues {
            println!(
                "  {} {}/{}: {}",
                style("!").yellow().bold(),
                wf.repository,
                wf.file_name(),
                truncate(issue, 120)
            );
        }
        println!();
    }

    let fetch_errors = report
        .repositories
        .iter()
        .flat_map(|r| r.workflows.iter())
        .filter(|wf| wf.fetch_error.is_some())
        .count();
    if fetch_errors > 0 {
        println!(
            "  {} {} workflow(s) could not be fetched and are shown with empty metrics",
            style("!").yellow().bold(),
            fetch_errors
        );
        println!();
    }

    if !report.skipped_repositories.is_empty() {
        println!("  {}", style("── Not examined ──").dim());
        for skipped in &report.skipped_repositories {
            println!(
                "  {} {}: {}",
                style("!").yellow().bold(),
                style(&skipped.repository).cyan(),
                truncate(&skipped.error, 120)
            );
        }
        println!();
    }
}

fn format_rate(rate: f64) -> String {
    let text = format!("{rate:.2}%");
    if rate >= 90.0 {
        style(text).green().to_string()
    } else if rate >= 60.0 {
        style(text).yellow().to_string()
    } else {
        style(text).red().to_string()
    }
}
