mod cli;
mod config;
mod error;
mod inoculator;
mod logging;
mod report;
mod runner;
mod tracker;
mod ui;
mod webdriver;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use cli::Cli;
use config::{DEFAULT_CONFIG_PATH, RunnerConfig};
use inoculator::InoculatorSession;
use report::ReportWriter;
use runner::Runner;
use tracker::{Pause, TokioPause};

/// How a run ended.
enum Outcome {
    Finished(bool),
    Interrupted,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();

    let (path, required) = match &cli.config {
        Some(p) => (p.clone(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };
    let mut config = RunnerConfig::load(&path, required)?;
    if cli.no_headless {
        config.headless = false;
    }
    if let Some(dir) = &cli.output {
        config.output_dir = dir.clone();
    }

    logging::init_logging(cli.verbose, config.log_file.as_deref())?;
    config.validate()?;

    let output_dir = config.output_dir.clone();
    let mut session = InoculatorSession::open(config.clone())
        .await
        .context("failed to start browser session")?;

    if let Err(e) = session.login().await {
        error!("login failed: {e}");
        if let Err(close) = session.close().await {
            warn!("failed to close browser session: {close}");
        }
        return Err(e).context("aborting before any phase");
    }

    let mut runner = Runner::new(config, cli.phase_selection());
    let outcome = if console::Term::stderr().is_term() {
        drive(&mut runner, &mut session, &ui::SpinnerPause::new()).await
    } else {
        drive(&mut runner, &mut session, &TokioPause).await
    };

    let mut ok = match outcome {
        Outcome::Finished(ok) => ok,
        Outcome::Interrupted => {
            ui::print_interrupted();
            false
        }
    };

    if runner.report.has_results() {
        match ReportWriter::new(&output_dir).write(&runner.report) {
            Ok(dir) => ui::print_saved(&dir),
            Err(e) => {
                error!("failed to save results: {e}");
                ok = false;
            }
        }
    } else {
        warn!("no phase produced results, nothing to save");
    }
    ui::print_summary(&runner.report);

    if let Err(e) = session.close().await {
        warn!("failed to close browser session: {e}");
    }
    info!(success = ok, "run finished");
    Ok(ok)
}

/// Runs the pipeline until it finishes or Ctrl-C arrives. The report keeps
/// every phase that completed before the interrupt.
async fn drive<P: Pause>(
    runner: &mut Runner,
    session: &mut InoculatorSession,
    pause: &P,
) -> Outcome {
    tokio::select! {
        ok = runner.run(session, pause) => Outcome::Finished(ok),
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping current phase");
            Outcome::Interrupted
        }
    }
}
