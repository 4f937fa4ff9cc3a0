//! Cluster Crash Test - CLI entry point.
//!
//! Sequences the entry workflow: argument parsing, privilege check, context
//! setup, then the orchestrator. Terminations are plain values mapped to
//! exit codes here, at the process boundary.

mod cli;
mod context;
mod host;
mod orchestrator;
mod report;
mod task;

use anyhow::{Context as _, Result};
use cct_common::{RunPaths, Termination, shell};
use clap::{CommandFactory, Parser};
use cli::Cli;
use context::RunContext;
use host::{ClusterHost, LocalHost};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const PROCESS_NAME: &str = "cct";

#[tokio::main]
async fn main() {
    let code = match run().await {
        Ok(()) => 0,
        Err(termination) => termination.exit_code(),
    };
    std::process::exit(code);
}

async fn run() -> Result<(), Termination> {
    let cli = Cli::parse();

    // No selector: print usage and leave with a non-failure status, before
    // any artifact is touched.
    if cli.selected_scenario().is_none() {
        let _ = Cli::command().print_long_help();
        println!();
        return Err(Termination::HelpRequested);
    }

    if !shell::is_root() {
        eprintln!("{PROCESS_NAME} can only be executed as user root");
        return Err(Termination::InsufficientPrivilege);
    }

    let paths = RunPaths::for_process(PROCESS_NAME);
    let _log_guard = match setup(&paths, cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{PROCESS_NAME}: setup failed: {e:#}");
            return Err(Termination::Fatal);
        }
    };

    info!(
        log = %paths.log_file.display(),
        results = %paths.json_file.display(),
        reports = %paths.report_dir.display(),
        "starting crash test run"
    );

    let mut ctx = RunContext::new(PROCESS_NAME, &cli, paths);
    let host = LocalHost;

    let result = tokio::select! {
        res = dispatch(&mut ctx, &host) => res,
        _ = tokio::signal::ctrl_c() => {
            // The in-flight scenario future is dropped here; any scoped
            // environment change restores itself on that path.
            warn!("interrupted by operator; restoring environment and flushing partial results");
            Err(Termination::Interrupted)
        }
    };

    if let Err(e) = ctx.sink.flush() {
        warn!("failed to persist results: {e}");
    }
    if let Err(termination) = &result {
        error!("run ended: {termination}");
    }
    result
}

/// All orchestration entry points run unconditionally; each one recognizes
/// on its own whether it has anything to do.
async fn dispatch<H: ClusterHost>(ctx: &mut RunContext, host: &H) -> Result<(), Termination> {
    orchestrator::kill_process(ctx, host).await?;
    orchestrator::fence_node(ctx, host).await?;
    orchestrator::split_brain(ctx, host).await?;
    Ok(())
}

/// Create artifact directories and initialize logging: a console layer plus
/// an append-only file layer under the run's log path.
fn setup(
    paths: &RunPaths,
    verbose: bool,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    paths
        .ensure_dirs()
        .with_context(|| format!("creating {}", paths.var_dir.display()))?;

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.log_file)
        .with_context(|| format!("opening {}", paths.log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(log_file);

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    Ok(guard)
}
