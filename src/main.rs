//! proxy-reconciler
//!
//! Converges the nginx reverse-proxy sites on this host onto the proxies
//! declared in a TOML configuration file.
//!
//! # Architecture Overview
//!
//! ```text
//!   config.toml ──▶ config (load, validate) ──▶ lifecycle::startup
//!                                                     │
//!                                                     ▼
//!   ┌──────────────────────────── reconcile::Reconciler ───────────────────────────┐
//!   │  proxy::Validator ──▶ desired ─┐                                             │
//!   │                                ├─▶ diff ──▶ activation::ActivationManager ───┼──▶ sites-available/
//!   │  state::StateRecovery ─▶ current┘                 │ render::ConfigRenderer   │    sites-enabled/
//!   └───────────────────────────────────────────────────┴──────────────────────────┘    systemctl reload
//! ```

use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use proxy_reconciler::config::watcher::ConfigWatcher;
use proxy_reconciler::config::{load_config, ReconcilerConfig};
use proxy_reconciler::lifecycle::{self, startup, Shutdown, SignalEvent, Signals, WatchInputs};
use proxy_reconciler::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "proxy-reconciler")]
#[command(about = "Reconcile nginx reverse-proxy sites against a declared set", long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "/etc/proxy-reconciler/config.toml")]
    config: PathBuf,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile once and exit
    Apply,
    /// Show what `apply` would change, without changing anything
    Plan,
    /// List the proxies currently active on this host
    Status,
    /// Disable the default site and remove legacy single-file configs
    Prepare,
    /// Reconcile now and again on every config change or SIGHUP
    Watch,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config(&cli.config);
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().map(|c| c.observability.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    logging::init_logging(&level);

    let result = match loaded {
        Ok(config) => run(&cli, config).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, config: ReconcilerConfig) -> Result<(), Box<dyn Error>> {
    match cli.command {
        Commands::Apply => {
            let reconciler = startup::build_reconciler(&config)?;
            let report = reconciler.run(&config.declared())?;
            if report.is_noop() {
                println!("nothing to do ({} proxies up to date)", report.desired);
            }
            for operation in &report.applied {
                println!("{}", operation);
            }
        }
        Commands::Plan => {
            let reconciler = startup::build_reconciler(&config)?;
            let plan = reconciler.plan(&config.declared())?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Status => {
            let reconciler = startup::build_reconciler(&config)?;
            let current = reconciler.current_set()?;
            println!("{}", serde_json::to_string_pretty(&current)?);
        }
        Commands::Prepare => {
            let reconciler = startup::build_reconciler(&config)?;
            reconciler.manager().disable_default_site()?;
            reconciler.manager().remove_legacy_configs()?;
        }
        Commands::Watch => watch(cli, config).await?,
    }
    Ok(())
}

async fn watch(cli: &Cli, config: ReconcilerConfig) -> Result<(), Box<dyn Error>> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let (watcher, updates) = ConfigWatcher::new(&cli.config);
    let _watcher = watcher.run()?;

    let shutdown = Shutdown::new();
    let (rerun_tx, reruns) = mpsc::unbounded_channel();
    let inputs = WatchInputs {
        updates,
        reruns,
        shutdown: shutdown.subscribe(),
    };

    let mut signals = Signals::register()?;
    tokio::spawn(async move {
        loop {
            match signals.recv().await {
                SignalEvent::Reconcile => {
                    let _ = rerun_tx.send(());
                }
                SignalEvent::Shutdown => {
                    tracing::info!("Shutdown signal received");
                    shutdown.trigger();
                    break;
                }
            }
        }
    });

    tracing::info!(config = %cli.config.display(), "proxy-reconciler watching");
    lifecycle::watch(config, startup::build_reconciler, inputs).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
