//! CLI command definitions and dispatch for the `warden` binary.
//!
//! Uses clap derive macros for argument parsing. Every command accepts the
//! global `--json` flag and prints machine-readable output when it is set.

pub mod analyze;
pub mod audit;
pub mod lifecycle;
pub mod report;
pub mod status;

use std::borrow::Cow;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

/// Find and quarantine chronically failing CI workflows.
#[derive(Parser)]
#[command(name = "warden", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit log events as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export trace spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Config file to use instead of `<data dir>/config.toml`.
    #[arg(long, global = true, env = "WARDEN_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze every workflow in the organization and store the report.
    Analyze {
        /// Also write the report to this path.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Disable the workflows flagged by the latest report.
    Disable {
        /// Use this report instead of the latest stored one.
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        confirmation: Confirmation,
    },

    /// Restore previously disabled workflows.
    Restore {
        /// Only restore workflows in this repository.
        #[arg(long)]
        repo: Option<String>,

        /// Only restore this workflow (path, file name, or workflow name).
        #[arg(long)]
        workflow: Option<String>,

        /// Restore every disabled workflow.
        #[arg(long)]
        all: bool,

        /// Match --workflow as a substring of the workflow path.
        #[arg(long, requires = "workflow")]
        substring: bool,

        #[command(flatten)]
        confirmation: Confirmation,
    },

    /// Show the latest analysis report.
    Report {
        /// Show this report file instead of the latest stored one.
        path: Option<PathBuf>,
    },

    /// List currently disabled workflows.
    Status,

    /// Show the most recent audit log entries.
    Audit {
        /// Number of entries to show.
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// `--dry-run` / `--confirm` pair shared by the mutating commands.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Confirmation {
    /// Report what would change without writing anything.
    #[arg(long, conflicts_with = "confirm")]
    pub dry_run: bool,

    /// Apply changes without prompting.
    #[arg(long)]
    pub confirm: bool,
}

/// What a mutating command should do once flags and config are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Simulate,
    Execute,
    Ask,
}

impl Confirmation {
    /// Explicit flags win; otherwise a dry-run default simulates and a
    /// live default asks first.
    pub fn decide(self, default_dry_run: bool) -> Decision {
        if self.dry_run {
            Decision::Simulate
        } else if self.confirm {
            Decision::Execute
        } else if default_dry_run {
            Decision::Simulate
        } else {
            Decision::Ask
        }
    }
}

/// Output preferences shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// A steady-ticking spinner, hidden for JSON or quiet output.
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        if self.json || self.quiet {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }
}

/// Shorten `text` to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_decide_flags_override_config() {
        let dry = Confirmation {
            dry_run: true,
            confirm: false,
        };
        let confirm = Confirmation {
            dry_run: false,
            confirm: true,
        };
        assert_eq!(dry.decide(false), Decision::Simulate);
        assert_eq!(confirm.decide(true), Decision::Execute);
        assert_eq!(Confirmation::default().decide(true), Decision::Simulate);
        assert_eq!(Confirmation::default().decide(false), Decision::Ask);
    }

    #[test]
    fn test_dry_run_conflicts_with_confirm() {
        let result = Cli::try_parse_from(["warden", "disable", "--dry-run", "--confirm"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_restore_flags_parse() {
        let cli = Cli::try_parse_from([
            "warden",
            "--json",
            "restore",
            "--repo",
            "api",
            "--workflow",
            "deploy",
            "--substring",
            "--confirm",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Restore {
                repo,
                workflow,
                all,
                substring,
                confirmation,
            } => {
                assert_eq!(repo.as_deref(), Some("api"));
                assert_eq!(workflow.as_deref(), Some("deploy"));
                assert!(!all);
                assert!(substring);
                assert!(confirmation.confirm);
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn test_substring_requires_workflow() {
        assert!(Cli::try_parse_from(["warden", "restore", "--all", "--substring"]).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer sentence", 10), "a much ...");
    }
}
