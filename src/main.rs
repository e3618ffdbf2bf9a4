//! Prisma Audit Forwarder - incremental audit-log forwarding to Log Analytics.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prisma_audit_forwarder::config::{watermark_db_path_from_env, ConfigLoader, ConnectorConfig};
use prisma_audit_forwarder::forwarder::{Connector, ConnectorError};
use prisma_audit_forwarder::watermark::{SqliteWatermarkStore, WatermarkStore};

#[derive(Parser)]
#[command(
    name = "prisma-audit-forwarder",
    about = "Forward Prisma Cloud audit logs to Azure Log Analytics",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Tuning file to use instead of the default search paths.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch new audit logs once and forward them.
    Run {
        /// Fetch but keep records in memory and leave the watermark untouched.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the stored audit watermark.
    Watermark {
        /// Delete it so the next run starts from the lookback boundary.
        #[arg(long)]
        reset: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

async fn run(loader: &ConfigLoader, dry_run: bool) -> Result<(), ConnectorError> {
    let config = ConnectorConfig::from_env(loader.load()?)?;
    tracing::debug!(?config, "Loaded configuration");
    tracing::info!(dry_run, "Script started");

    let mut connector = Connector::from_config(&config, dry_run).await?;
    let summary = connector.run().await?;

    for report in &summary.reports {
        tracing::info!(
            category = %report.category,
            forwarded = report.forwarded,
            watermark = ?report.watermark,
            persisted = report.persisted,
            "Category finished"
        );
    }
    tracing::info!(
        sent_events = summary.sent_events,
        "Program finished. Events have been sent"
    );
    Ok(())
}

async fn watermark(loader: &ConfigLoader, reset: bool) -> Result<(), ConnectorError> {
    let tuning = loader.load()?;
    let path = watermark_db_path_from_env();
    let store = SqliteWatermarkStore::open(&path, tuning.store_key).await?;

    if reset {
        let removed = store.clear().await?;
        tracing::info!(removed, key = store.key(), "Watermark reset");
        return Ok(());
    }

    match store.get().await? {
        Some(value) => println!("{}: {value}", store.key()),
        None => println!("{}: <none>", store.key()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = cli
        .config
        .map_or_else(ConfigLoader::new, ConfigLoader::with_path);

    let result = match cli.command {
        Commands::Run { dry_run } => run(&loader, dry_run).await,
        Commands::Watermark { reset } => watermark(&loader, reset).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            ExitCode::FAILURE
        }
    }
}
