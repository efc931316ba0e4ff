//! Proof-of-Work Mining Client - Main Application
//!
//! Loads the configuration, builds the initial header and target, runs the
//! configured search and reports the outcome.

use pow_mining_client::{
    config::{Algorithm, Config},
    utils,
    worker::{MiningStats, MiningWorker, SearchOutcome, WorkerFactory},
    Error, Result, APP_NAME, APP_VERSION,
};

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().await?;

    // RUST_LOG wins over the configured level when set
    let level: tracing::Level = config.log_level.into();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    if config.print_config {
        print_configuration(&config)?;
        return Ok(());
    }

    info!("Starting {} v{}", APP_NAME, APP_VERSION);
    info!(
        "Configuration: algorithm={}, threads={}, bits={}",
        config.algorithm, config.thread_count, config.bits
    );

    let header = config.header()?;
    let target = config.target()?;
    let limits = config.search_limits();

    info!("Initial header: {}", header);
    info!("Target: {}", target);

    let mut worker = create_worker(&config)?;

    // Ctrl-C stops the search cooperatively
    let cancellation = CancellationToken::new();
    let signal_token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, stopping search");
            signal_token.cancel();
        }
    });

    let (stats_tx, mut stats_rx) = mpsc::unbounded_channel::<MiningStats>();
    let stats_handle = tokio::spawn(async move {
        while let Some(stats) = stats_rx.recv().await {
            debug!(
                "Mining stats: {} hashes, {}",
                stats.total_hashes,
                utils::format_hash_rate(stats.current_hash_rate)
            );
        }
    });

    let started = Instant::now();
    let outcome = worker
        .mine(header, target, limits, cancellation, Some(stats_tx))
        .await;
    let elapsed = started.elapsed();
    stats_handle.abort();

    report_outcome(outcome, &*worker, elapsed)
}

/// Create the worker for the configured algorithm
fn create_worker(config: &Config) -> Result<Box<dyn MiningWorker>> {
    match config.algorithm {
        Algorithm::Sha256d => Ok(WorkerFactory::create_sha256d_worker(config.thread_count)),
        Algorithm::Scrypt => Ok(WorkerFactory::create_scrypt_worker(
            config.scrypt_params()?,
            config.thread_count,
        )),
    }
}

/// Print the search result and final statistics
fn report_outcome(
    outcome: Result<SearchOutcome>,
    worker: &dyn MiningWorker,
    elapsed: Duration,
) -> Result<()> {
    let stats = worker.stats();
    let elapsed_display = humantime::format_duration(Duration::from_secs(elapsed.as_secs()));

    match outcome {
        Ok(SearchOutcome::Found(solution)) => {
            println!("success! nonce={} time={}", solution.nonce, solution.time);
            println!("digest: {}", solution.digest_display());
            println!(
                "elapsed: {} ({} hashes, {})",
                elapsed_display,
                stats.total_hashes,
                utils::format_hash_rate(stats.average_hash_rate)
            );
            Ok(())
        }
        Ok(SearchOutcome::Exhausted) => {
            warn!(
                "Search space exhausted after {} hashes in {}",
                stats.total_hashes, elapsed_display
            );
            Ok(())
        }
        Err(Error::Cancelled { .. }) => {
            info!(
                "Search stopped after {} hashes in {}",
                stats.total_hashes, elapsed_display
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Print current configuration
fn print_configuration(config: &Config) -> Result<()> {
    let config_yaml = serde_yaml::to_string(config)?;
    println!("{}", config_yaml);
    Ok(())
}
