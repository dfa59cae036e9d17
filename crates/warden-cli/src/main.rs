//! Warden CLI entry point.
//!
//! Binary name: `warden`
//!
//! Parses CLI arguments, loads configuration, wires the stores, then
//! dispatches to the command handler. Any fatal error is printed as one
//! `error: ...` line and the process exits with status 1.

mod cli;
mod state;

use std::process::ExitCode;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;
use warden_observe::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands, Output};
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let options = TracingOptions::from_verbosity(cli.verbose, cli.quiet)
        .with_json(cli.log_json)
        .with_otel(cli.otel);
    if let Err(e) = init_tracing(&options) {
        eprintln!("warning: failed to initialise logging: {e}");
    }

    let result = run(cli).await;
    shutdown_tracing();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "warden", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.config.as_deref()).await?;
    let out = Output {
        json: cli.json,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Analyze { output } => {
            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());
            cli::analyze::analyze(&state, output.as_deref(), cancel, out).await?;
        }

        Commands::Disable {
            report,
            confirmation,
        } => {
            cli::lifecycle::disable(&state, report.as_deref(), confirmation, out).await?;
        }

        Commands::Restore {
            repo,
            workflow,
            all,
            substring,
            confirmation,
        } => {
            let filter = cli::lifecycle::restore_filter(repo, workflow, all, substring);
            cli::lifecycle::restore(&state, &filter, confirmation, out).await?;
        }

        Commands::Report { path } => {
            cli::report::show_report(&state, path.as_deref(), out).await?;
        }

        Commands::Status => {
            cli::status::status(&state, out).await?;
        }

        Commands::Audit { limit } => {
            cli::audit::tail(&state, limit, out).await?;
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}

/// Cancel `token` on the first Ctrl+C. In-flight requests finish; nothing
/// new is started.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after in-flight requests");
            token.cancel();
        }
    });
}
