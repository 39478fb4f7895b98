//! omni-send - Background daemon for scheduled publishing
//!
//! Seeds the in-memory job store from a jobs file and publishes each job to
//! its platforms once it is due.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use libomnicast::service::events::{Event, EventReceiver};
use libomnicast::{Config, JobRequest, OmnicastError, OmnicastService};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "omni-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled publishing")]
#[command(long_about = "\
omni-send - Background daemon for scheduled publishing

DESCRIPTION:
    omni-send is a long-running daemon that keeps a queue of publish jobs
    and sends each one to all of its platforms when it becomes due.

    Every tick it claims due jobs, calls each platform in turn, and
    records per-platform results. A job is POSTED when every platform
    succeeded and FAILED otherwise; failed jobs are never retried.

    Jobs live in memory only. Seed them at startup with --jobs.

USAGE:
    # Run in foreground (logs to stderr)
    omni-send --jobs jobs.json

    # Tick every 10 seconds
    omni-send --jobs jobs.json --tick-interval 10

    # Publish whatever is due now and exit
    omni-send --jobs jobs.json --once

JOBS FILE:
    A JSON array of job requests:

    [
      { \"platforms\": [\"telegram\", \"mastodon\"],
        \"text\": \"Doors open at 9\",
        \"whenISO\": \"2030-01-01T09:00:00Z\",
        \"mediaUrls\": [\"https://example.com/poster.png\"] }
    ]

    whenISO also accepts \"30m\", \"tomorrow 9am\" or \"random:1h-3h\".
    Omit it to publish on the first tick.

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current tick)

CONFIGURATION:
    Configuration file: ~/.config/omnicast/config.toml

    [scheduler]
    tick_interval = 60     # seconds between ticks
    call_timeout = 12      # seconds per platform call
    fan_out = \"sequential\" # or \"parallel\"

    [credentials.telegram]
    tokens = { bot_token = \"${TELEGRAM_BOT_TOKEN}\" }
    account = { chat_id = \"-100123\" }

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime or configuration error
    3 - Invalid jobs file
")]
struct Cli {
    /// JSON file of jobs to enqueue at startup
    #[arg(long, value_name = "FILE")]
    jobs: Option<PathBuf>,

    /// Tick interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    tick_interval: Option<u64>,

    /// Path to config file (overrides OMNICAST_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,

    /// Run a single tick, print the outcome as JSON and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libomnicast::logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<OmnicastError>()
            .map(OmnicastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_default()?,
    };
    if let Some(secs) = cli.tick_interval {
        if secs == 0 {
            return Err(OmnicastError::Validation(
                "--tick-interval must be at least 1 second".to_string(),
            )
            .into());
        }
        config.scheduler.tick_interval = secs;
    }

    let service = OmnicastService::from_config(config)?;

    if let Some(path) = &cli.jobs {
        let requests = read_jobs(path)?;
        let jobs = service.enqueue_bulk(requests)?;
        info!(count = jobs.len(), file = %path.display(), "Jobs enqueued");
    }

    if cli.once {
        let report = service.tick().await;
        let output = serde_json::json!({
            "report": report,
            "jobs": service.list_jobs(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    info!(
        tick_interval = service.config().scheduler.tick_interval,
        "omni-send daemon starting"
    );

    let events = tokio::spawn(log_events(service.subscribe()));
    let scheduler = service.start_scheduler();

    wait_for_shutdown().await?;
    info!("Received shutdown signal, stopping gracefully...");

    scheduler.shutdown().await;
    events.abort();
    info!("omni-send daemon stopped");
    Ok(())
}

fn read_jobs(path: &Path) -> anyhow::Result<Vec<JobRequest>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read jobs file {}", path.display()))?;
    let requests = serde_json::from_str(&content).map_err(|e| {
        OmnicastError::Validation(format!("Invalid jobs file {}: {}", path.display(), e))
    })?;
    Ok(requests)
}

async fn log_events(mut receiver: EventReceiver) {
    loop {
        match receiver.recv().await {
            Ok(Event::JobPosted { job_id, results }) => {
                info!(job_id = %job_id, platforms = results.len(), "Job posted");
            }
            Ok(Event::JobFailed { job_id, error, .. }) => {
                error!(job_id = %job_id, error = %error, "Job failed");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event log fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> anyhow::Result<()> {
    use futures::stream::StreamExt;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook_tokio::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Signal setup failed")?;
    let handle = signals.handle();

    if let Some(signal) = signals.next().await {
        info!(signal, "Signal received");
    }
    handle.close();
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("Signal setup failed")?;
    Ok(())
}
