use anyhow::Context;
use chrono::Local;
use clap::Parser;
use listing_scout::config::{Cli, ScrapeConfig};
use listing_scout::scrapers::ChromeSession;
use listing_scout::{Interrupt, Orchestrator, RunOutcome, RunSummary};
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console logging plus an optional plain-text run log. Returns the log file path.
fn init_logging(cli: &Cli) -> anyhow::Result<Option<PathBuf>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, log_path) = if cli.no_log_file {
        (None, None)
    } else {
        fs::create_dir_all(&cli.log_dir)
            .with_context(|| format!("Failed to create log directory {}", cli.log_dir.display()))?;
        let path = cli
            .log_dir
            .join(format!("scraper_{}.log", Local::now().format("%Y%m%d_%H%M%S")));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        let layer = fmt::layer().with_ansi(false).with_writer(Mutex::new(file));
        (Some(layer), Some(path))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(log_path)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let log_path = init_logging(&cli)?;

    info!("🏠 Listing Scout - property listing scraper");
    info!("==========================================");
    if let Some(path) = &log_path {
        info!("Logging to {}", path.display());
    }

    let config = ScrapeConfig::try_from(&cli).context("Invalid configuration")?;
    info!("Target: {}", config.search_url);
    info!("Pages: {} starting at {}", config.pages, config.start_page);
    info!("Output directory: {}", config.output.dir.display());

    let interrupt = Interrupt::new();
    let on_signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted by user, saving what has been collected...");
            on_signal.raise();
        }
    });

    // The pipeline is blocking and strictly sequential; it owns the browser for its whole life
    let summary: RunSummary = tokio::task::spawn_blocking(move || -> anyhow::Result<RunSummary> {
        let session =
            ChromeSession::launch(&config.browser).context("Browser session could not be acquired")?;
        let orchestrator = Orchestrator::new(session, config, interrupt)?;
        Ok(orchestrator.run()?)
    })
    .await
    .context("Scrape task did not finish")??;

    let code = match &summary.outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Interrupted { .. } => ExitCode::from(130),
        RunOutcome::Halted { reason, .. } => {
            error!("Run stopped early: {}", reason);
            ExitCode::FAILURE
        }
    };

    info!(
        "✅ {} properties saved to {}",
        summary.records,
        summary.export_path.display()
    );
    if let Some(path) = &summary.json_path {
        info!("💾 JSON copy at {}", path.display());
    }

    Ok(code)
}
