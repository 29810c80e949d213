//! sitewatch CLI
//!
//! Local execution entry point for one-off runs, single-site checks and the
//! daily schedule.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sitewatch::{
    error::Result,
    models::Config,
    pipeline::{self, RunCoordinator},
    services::ExtractionRule,
    storage::{LocalSnapshotStore, SnapshotStorage},
};

/// Exit status of a cycle in which at least one site failed.
const EXIT_UNCLEAN: u8 = 2;

/// sitewatch - Competitor Blog Monitor
#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Watches competitor blogs for new keyword-relevant articles"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every site once and send the summary
    Run,

    /// Check a single site and send site-level alerts
    Site {
        /// Site key, e.g. `fictiv`
        key: String,
    },

    /// Run a cycle every day at `task.run_time`
    Daemon,

    /// Validate the configuration file
    Validate,

    /// Show the stored snapshot of every site
    Info,

    /// List configured sites
    Sites,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config.validate()?;
    Ok(config)
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("sitewatch starting...");

    match cli.command {
        Command::Run => {
            let config = load_config(&cli.config)?;
            let mut coordinator = RunCoordinator::from_config(&config)?;
            let report = coordinator.run_cycle().await;
            if let Err(e) = coordinator.shutdown().await {
                log::warn!("Shutdown failed: {e}");
            }

            if !report.is_clean() {
                log::warn!("{} of {} sites failed", report.failed, report.total_sites());
                return Ok(ExitCode::from(EXIT_UNCLEAN));
            }
        }

        Command::Site { key } => {
            let config = load_config(&cli.config)?;
            let mut coordinator = RunCoordinator::from_config(&config)?;
            let outcome = coordinator.run_site(&key).await;
            if let Err(e) = coordinator.shutdown().await {
                log::warn!("Shutdown failed: {e}");
            }

            let outcome = outcome?;
            if !outcome.succeeded {
                return Ok(ExitCode::from(EXIT_UNCLEAN));
            }
            log::info!(
                "{} new matching articles after {} attempts",
                outcome.matched_articles.len(),
                outcome.attempts
            );
        }

        Command::Daemon => {
            let config = load_config(&cli.config)?;
            let run_time = config.task.run_time()?;
            let mut coordinator = RunCoordinator::from_config(&config)?;

            tokio::select! {
                _ = pipeline::run_daily(&mut coordinator, run_time) => {}
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        log::error!("Failed to listen for shutdown signal: {e}");
                    }
                    log::info!("Shutdown requested");
                }
            }

            coordinator.shutdown().await?;
        }

        Command::Validate => {
            log::info!("Validating {}...", cli.config.display());

            let config = Config::load(&cli.config)?;
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} sites, {} keywords)",
                config.targets.len(),
                config.keywords.len()
            );
        }

        Command::Info => {
            let config = Config::load_or_default(&cli.config);
            let store = LocalSnapshotStore::new(&config.storage.data_file);
            log::info!("Snapshot file: {}", store.path().display());

            let snapshot = store.load_all().await?;
            if snapshot.is_empty() {
                log::info!("No snapshot found yet.");
            }
            for (key, articles) in &snapshot {
                log::info!("{key}: {} articles", articles.len());
                for article in articles {
                    log::info!("    {} - {}", article.title, article.url);
                }
            }
        }

        Command::Sites => {
            let config = Config::load_or_default(&cli.config);
            for target in &config.targets {
                let mut flags = Vec::new();
                if target.requires_rendering {
                    flags.push("rendered");
                }
                if ExtractionRule::for_key(&target.key).is_none() {
                    flags.push("no rule");
                }
                let flags = if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                };
                log::info!("{:<16} {:<16} {}{flags}", target.key, target.name, target.url);
            }
        }
    }

    log::info!("Done!");

    Ok(ExitCode::SUCCESS)
}
