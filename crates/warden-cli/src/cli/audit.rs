//! `audit` command: tail the audit log.

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use warden_core::repository::store::AuditLog;
use warden_types::audit::AuditLogEntry;

use super::{Output, truncate};
use crate::state::AppState;

/// Show the last `limit` audit entries, oldest first.
pub async fn tail(state: &AppState, limit: usize, out: Output) -> Result<()> {
    let entries = state
        .lifecycle
        .audit()
        .log()
        .recent(limit)
        .await
        .context("failed to read the audit log")?;

    if out.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  {} The audit log is empty.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("Action").fg(Color::White),
        Cell::new("Target").fg(Color::White),
        Cell::new("Result").fg(Color::White),
        Cell::new("Detail").fg(Color::White),
    ]);

    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.timestamp.format("%Y-%m-%d %H:%M:%S")).fg(Color::DarkGrey),
            Cell::new(entry.action),
            Cell::new(target(entry)).fg(Color::Cyan),
            result_cell(entry),
            Cell::new(truncate(&detail(entry), 70)),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

fn target(entry: &AuditLogEntry) -> String {
    match (&entry.repository, &entry.workflow) {
        (Some(repo), Some(workflow)) => format!("{repo}/{workflow}"),
        (Some(repo), None) => repo.clone(),
        _ => "-".to_string(),
    }
}

fn result_cell(entry: &AuditLogEntry) -> Cell {
    if entry.dry_run {
        Cell::new("simulated").fg(Color::Blue)
    } else if entry.success {
        Cell::new("✓ ok").fg(Color::Green)
    } else {
        Cell::new("✗ failed").fg(Color::Red)
    }
}

fn detail(entry: &AuditLogEntry) -> String {
    if let Some(error) = &entry.error {
        return error.clone();
    }
    entry
        .details
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
