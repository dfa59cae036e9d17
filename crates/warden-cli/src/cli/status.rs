//! `status` command: currently disabled workflows and where state lives.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use warden_core::repository::store::{ManifestStore, ReportStore};

use super::{Output, truncate};
use crate::state::AppState;

/// Display the manifest of disabled workflows.
pub async fn status(state: &AppState, out: Output) -> Result<()> {
    let manifest = state
        .lifecycle
        .manifest_store()
        .load()
        .await
        .context("failed to read the disabled-workflow manifest")?;
    let latest = state.reports.load_latest().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "latest report unreadable");
        None
    });

    if out.json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "organization": state.config.organization,
            "data_dir": state.layout.root().display().to_string(),
            "config": state.config_path.display().to_string(),
            "dry_run_default": state.config.dry_run,
            "latest_report": latest.as_ref().map(|r| r.generated_at),
            "disabled": manifest.workflows,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Warden v{}",
        style("⚑").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();

    println!("  {}", style("── Configuration ──").dim());
    let org = if state.config.organization.is_empty() {
        style("(not set)".to_string()).yellow()
    } else {
        style(state.config.organization.clone()).cyan()
    };
    println!("  Organization: {org}");
    println!(
        "  Thresholds:   {} consecutive failures, {}% failure rate over {} days",
        state.config.failure_threshold,
        state.config.failure_rate_threshold,
        state.config.time_window_days
    );
    println!(
        "  Default mode: {}",
        if state.config.dry_run { "dry run" } else { "live" }
    );
    match &latest {
        Some(report) => println!(
            "  Last report:  {}",
            report.generated_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => println!("  Last report:  {}", style("none").dim()),
    }
    println!();

    println!("  {}", style("── Disabled workflows ──").dim());
    if manifest.is_empty() {
        println!("  None.");
    } else {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL_CONDENSED);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Repository").fg(Color::White),
            Cell::new("Workflow").fg(Color::White),
            Cell::new("Disabled").fg(Color::White),
            Cell::new("Reasons").fg(Color::White),
        ]);
        for record in &manifest.workflows {
            table.add_row(vec![
                Cell::new(&record.repository).fg(Color::Cyan),
                Cell::new(&record.original_path),
                Cell::new(record.disabled_at.format("%Y-%m-%d %H:%M")).fg(Color::DarkGrey),
                Cell::new(truncate(&record.reasons.join("; "), 60)),
            ]);
        }
        println!("{table}");
        println!(
            "  {} workflow{}",
            style(manifest.len()).bold(),
            if manifest.len() == 1 { "" } else { "s" }
        );
    }
    println!();

    println!("  {}", style("── System ──").dim());
    println!(
        "  Data dir: {}",
        style(state.layout.root().display()).dim()
    );
    println!(
        "  Config:   {}",
        style(state.config_path.display()).dim()
    );
    println!(
        "  Backups:  {}",
        style(state.layout.backup_dir().display()).dim()
    );
    println!();

    Ok(())
}
