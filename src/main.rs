//! Sockguard - Entry Point
//!
//! `guard` runs the periodic validator (and the API server when enabled);
//! `locate` annotates a proxy list with geolocation data.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sockguard::api::ApiServer;
use sockguard::config::{Config, LogConfig};
use sockguard::geo::{self, GeoLocator};
use sockguard::guard::{
    CheckedSet, Classifier, EchoVerifier, ReputationChecker, ResultStore, ResultWriter,
    Socks5Probe, WorkerPool,
};
use sockguard::services::{BatchSource, FileBatchSource, GuardService, StaticBatchSource};
use sockguard::GuardError;

#[derive(Debug, Parser)]
#[command(name = "sockguard", version, about = "SOCKS5 proxy vetting service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Periodically validate candidate proxies
    Guard {
        /// File with one host:port per line, re-read every cycle
        file: Option<PathBuf>,

        /// Candidate given on the command line (repeatable)
        #[arg(long = "proxy", value_name = "HOST:PORT", conflicts_with = "file")]
        proxies: Vec<String>,
    },
    /// Annotate a proxy list with city and country
    Locate {
        /// File with one host:port per line
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log);

    let result = match cli.command {
        Command::Guard { file, proxies } => run_guard(config, file, proxies).await,
        Command::Locate { file } => run_locate(config, file).await,
    };

    if let Err(e) = result {
        error!("{:#}", e);
        if matches!(e.downcast_ref::<GuardError>(), Some(GuardError::MissingInput)) {
            eprintln!("{}", Cli::command().render_usage());
        }
        std::process::exit(1);
    }
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("sockguard={},tower_http=info", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn batch_source(
    file: Option<PathBuf>,
    proxies: Vec<String>,
) -> sockguard::Result<Arc<dyn BatchSource>> {
    if let Some(path) = file {
        return Ok(Arc::new(FileBatchSource::open(path)?));
    }

    let source = StaticBatchSource::from_entries(proxies);
    if source.is_empty() {
        return Err(GuardError::MissingInput);
    }
    Ok(Arc::new(source))
}

async fn run_guard(
    config: Config,
    file: Option<PathBuf>,
    proxies: Vec<String>,
) -> anyhow::Result<()> {
    let source = batch_source(file, proxies)?;
    info!("Starting Sockguard on {}", source.describe());

    let timeout = config.guard.check_timeout();
    let probe = Arc::new(Socks5Probe::new(&config.guard.probe_target, timeout)?);
    let traffic = Arc::new(EchoVerifier::new(config.guard.echo_url.clone(), timeout));
    let reputation = ReputationChecker::from_config(&config.reputation, timeout)?;
    if config.reputation.api_key.is_none() {
        info!("ABUSEIPDB_API_KEY not set, reputation checks will pass every proxy");
    }

    let store = ResultStore::new();
    let classifier = Classifier::new(
        CheckedSet::new(),
        store.clone(),
        probe,
        traffic,
        reputation,
    );
    let pool = WorkerPool::new(Arc::new(classifier), config.guard.max_workers);
    let writer = ResultWriter::new(
        config.guard.blacklist_file.clone(),
        config.guard.not_working_file.clone(),
    );
    let service = GuardService::new(source, pool, writer, config.guard.interval());

    let (shutdown_tx, _) = watch::channel(false);

    let api_task = if config.api.enabled {
        let api_server = ApiServer::new(config.api.clone(), store.clone(), service.status());
        let api_shutdown = shutdown_tx.subscribe();
        info!("API server enabled on {}", config.api_addr());
        Some(tokio::spawn(async move {
            if let Err(e) = api_server.run(api_shutdown).await {
                error!("API server error: {}", e);
            }
        }))
    } else {
        None
    };

    let guard_shutdown = shutdown_tx.subscribe();
    let guard_task = tokio::spawn(async move {
        service.run(guard_shutdown).await;
    });

    shutdown_signal().await;
    info!("Shutdown signal received, finishing current batch");

    let _ = shutdown_tx.send(true);

    let _ = guard_task.await;
    if let Some(task) = api_task {
        let _ = task.await;
    }

    info!("Sockguard stopped");
    Ok(())
}

async fn run_locate(config: Config, file: PathBuf) -> anyhow::Result<()> {
    if config.geo.api_key.is_none() {
        info!("IPINFO_API_KEY not set, every location will be unknown");
    }
    let locator = GeoLocator::new(&config.geo)?;
    geo::annotate_file(&locator, &file).await?;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
