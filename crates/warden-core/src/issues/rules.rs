//! Built-in detection rules.

use std::collections::BTreeMap;

use serde_yaml_ng::Value;
use warden_types::run::file_name_of;

use super::{DefinitionContext, DetectionRule, FnRepositoryRule, FnRule, RepositoryRule};

/// Commands treated as dependency installation when they appear in a `run`
/// step.
const INSTALL_COMMANDS: &[&str] = &[
    "npm ci",
    "npm install",
    "yarn install",
    "pnpm install",
    "pip install",
    "poetry install",
    "bundle install",
    "composer install",
    "go mod download",
    "cargo fetch",
];

/// Mutable refs that make an action reference unpinned.
const FLOATING_REFS: &[&str] = &["main", "master", "HEAD", "latest"];

pub fn default_rules() -> Vec<Box<dyn DetectionRule>> {
    vec![
        Box::new(FnRule("high-frequency-schedule", high_frequency_schedule)),
        Box::new(FnRule("invalid-cron", invalid_cron)),
        Box::new(FnRule("unpinned-action", unpinned_action)),
        Box::new(FnRule("duplicate-install", duplicate_install_steps)),
    ]
}

pub fn default_repository_rules() -> Vec<Box<dyn RepositoryRule>> {
    vec![Box::new(FnRepositoryRule(
        "multiple-push-deploys",
        multiple_push_deploys,
    ))]
}

// ---------------------------------------------------------------------------
// Per-definition rules
// ---------------------------------------------------------------------------

/// A schedule whose minute field is a wildcard or a list fires more than
/// hourly.
pub fn high_frequency_schedule(ctx: &DefinitionContext<'_>) -> Vec<String> {
    schedule_expressions(ctx.document)
        .into_iter()
        .filter(|expr| {
            expr.split_whitespace()
                .next()
                .is_some_and(|minute| minute.starts_with('*') || minute.contains(','))
        })
        .map(|expr| format!("High-frequency schedule: '{expr}'"))
        .collect()
}

pub fn invalid_cron(ctx: &DefinitionContext<'_>) -> Vec<String> {
    schedule_expressions(ctx.document)
        .into_iter()
        .filter_map(|expr| match expr.parse::<croner::Cron>() {
            Ok(_) => None,
            Err(e) => Some(format!("Invalid cron expression '{expr}': {e}")),
        })
        .collect()
}

/// `uses:` references pinned to a moving branch, or to nothing at all.
pub fn unpinned_action(ctx: &DefinitionContext<'_>) -> Vec<String> {
    let mut issues = Vec::new();
    for (job, steps) in job_steps(ctx.document) {
        for step in steps {
            let Some(uses) = step.get("uses").and_then(Value::as_str) else {
                continue;
            };
            if uses.starts_with("./") || uses.starts_with("docker://") {
                continue;
            }
            let unpinned = match uses.rsplit_once('@') {
                Some((_, reference)) => FLOATING_REFS.contains(&reference),
                None => true,
            };
            if unpinned {
                issues.push(format!("Unpinned action reference '{uses}' in job '{job}'"));
            }
        }
    }
    issues
}

/// The same install command (or setup action) repeated within one job.
pub fn duplicate_install_steps(ctx: &DefinitionContext<'_>) -> Vec<String> {
    let mut issues = Vec::new();
    for (job, steps) in job_steps(ctx.document) {
        let mut seen: BTreeMap<String, u32> = BTreeMap::new();
        for step in steps {
            if let Some(run) = step.get("run").and_then(Value::as_str) {
                for line in run.lines().map(str::trim) {
                    if let Some(cmd) = INSTALL_COMMANDS.iter().find(|c| line.starts_with(**c)) {
                        *seen.entry((*cmd).to_string()).or_default() += 1;
                    }
                }
            }
            if let Some(uses) = step.get("uses").and_then(Value::as_str) {
                let action = uses.split('@').next().unwrap_or(uses);
                if action.starts_with("actions/setup-") {
                    *seen.entry(action.to_string()).or_default() += 1;
                }
            }
        }
        for (cmd, count) in seen {
            if count > 1 {
                issues.push(format!(
                    "Duplicate installation step '{cmd}' in job '{job}' ({count} times)"
                ));
            }
        }
    }
    issues
}

// ---------------------------------------------------------------------------
// Repository rules
// ---------------------------------------------------------------------------

/// Flags every push-triggered deployment workflow when a repository has more
/// than one.
pub fn multiple_push_deploys(
    _repository: &str,
    definitions: &[DefinitionContext<'_>],
) -> Vec<(String, String)> {
    let deploys: Vec<&DefinitionContext<'_>> = definitions
        .iter()
        .filter(|ctx| triggered_on_push(ctx.document) && looks_like_deploy(ctx))
        .collect();
    if deploys.len() < 2 {
        return Vec::new();
    }

    let names: Vec<&str> = deploys.iter().map(|ctx| file_name_of(ctx.path)).collect();
    let message = format!(
        "Multiple push-triggered deployment workflows in repository ({}: {})",
        deploys.len(),
        names.join(", ")
    );
    deploys
        .iter()
        .map(|ctx| (ctx.path.to_string(), message.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Document helpers
// ---------------------------------------------------------------------------

fn schedule_expressions(doc: &Value) -> Vec<&str> {
    doc.get("on")
        .and_then(|on| on.get("schedule"))
        .and_then(Value::as_sequence)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.get("cron").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

fn job_steps(doc: &Value) -> Vec<(String, &[Value])> {
    let Some(jobs) = doc.get("jobs").and_then(Value::as_mapping) else {
        return Vec::new();
    };
    jobs.iter()
        .filter_map(|(name, job)| {
            let name = name.as_str()?.to_string();
            let steps = job.get("steps").and_then(Value::as_sequence)?;
            Some((name, steps.as_slice()))
        })
        .collect()
}

fn triggered_on_push(doc: &Value) -> bool {
    match doc.get("on") {
        Some(Value::String(event)) => event == "push",
        Some(Value::Sequence(events)) => events.iter().any(|e| e.as_str() == Some("push")),
        Some(Value::Mapping(events)) => events.contains_key("push"),
        _ => false,
    }
}

fn looks_like_deploy(ctx: &DefinitionContext<'_>) -> bool {
    if file_name_of(ctx.path).to_lowercase().contains("deploy") {
        return true;
    }
    ctx.document
        .get("jobs")
        .and_then(Value::as_mapping)
        .is_some_and(|jobs| {
            jobs.keys()
                .filter_map(Value::as_str)
                .any(|name| name.to_lowercase().contains("deploy"))
        })
}
