//! quakecast - Earthquake dataset explorer and magnitude prediction dashboard.
//!
//! Explores a historical earthquake dataset and estimates the magnitude of
//! user-described events with a pretrained regression pipeline.

use std::fs::File;
use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;

mod cli;
mod errors;
mod estimator;
mod explorer;
mod features;
mod geocode;
mod models;
mod output;
mod server;
mod session;
mod workflow;

use cli::{Cli, Command, ResourceArgs};
use estimator::FileModelSource;
use explorer::Dataset;
use geocode::NominatimClient;
use session::Session;
use workflow::PredictionWorkflow;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Ui(args) => cmd_ui(args),
        Command::Explore(args) => cmd_explore(&args),
        Command::Predict(args) => cmd_predict(&args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Build the prediction workflow from the shared resource flags.
fn build_workflow(resources: &ResourceArgs) -> Result<PredictionWorkflow> {
    let geocoder = NominatimClient::new(
        &resources.geocoder_url,
        Duration::from_secs(resources.geocode_timeout.max(1)),
    )
    .context("failed to create geocoding client")?;

    let model = FileModelSource::new(&resources.model);
    tracing::debug!("model artifact: {}", model.path().display());

    Ok(PredictionWorkflow::new(Arc::new(model), Arc::new(geocoder)))
}

/// Execute the `explore` command - summarize the dataset.
fn cmd_explore(args: &cli::ExploreArgs) -> Result<()> {
    let dataset = Dataset::load(&args.resources.dataset).context("failed to load dataset")?;
    if dataset.is_empty() {
        tracing::warn!("dataset has no rows");
    }

    let report = dataset.explore();

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_report(&mut handle, &report, args.format)?;

    Ok(())
}

/// Execute the `predict` command - one prediction in a fresh session.
fn cmd_predict(args: &cli::PredictArgs) -> Result<()> {
    let workflow = build_workflow(&args.resources)?;
    let mut session = Session::new();

    let last = workflow
        .predict(&mut session, args.record())
        .context("prediction failed")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_prediction(&mut handle, last, args.format)?;

    if let Some(path) = &args.export {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        session
            .write_history_csv(file)
            .context("failed to export prediction history")?;
        tracing::info!("prediction history written to {}", path.display());
    }

    Ok(())
}

/// Execute the `ui` command - start web server.
fn cmd_ui(args: cli::UiArgs) -> Result<()> {
    let workflow = build_workflow(&args.resources)?;

    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        dataset: args.resources.dataset.clone(),
        session_idle_timeout: Duration::from_secs(args.session_idle_minutes.max(1).saturating_mul(60)),
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🌍 quakecast dashboard\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:   \x1b[96m{url}\x1b[0m");
    println!("  Dataset: {}", args.resources.dataset.display());
    println!("  Model:   {}", args.resources.model.display());
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(server::run_server(config, workflow))
}
