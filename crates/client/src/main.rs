// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use chrono::{DateTime, Utc};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::error;

use chowki::config::Config;
use chowki::local_match::LocalMatcher;
use chowki::sms_fallback::{CommandSender, SmsSender};
use chowki::store::{build_local_passage, LocalStore};
use chowki::sync::SyncEngine;
use chowki_core::VehicleType;

#[derive(Parser)]
#[command(name = "chowki", version, about = "Checkpost passage recorder and sync engine.")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Record a passage locally and queue it for sync.
    Record(RecordArgs),
    /// Run the sync engine until interrupted.
    Run,
    /// Print queue counts and cache size.
    Status,
}

#[derive(clap::Args)]
struct RecordArgs {
    /// Plate text as captured (canonicalized before storage).
    #[arg(long)]
    plate: String,

    /// Vehicle type (car, jeep, pickup, van, minibus, bus, truck, tanker,
    /// motorcycle, auto, tractor, other).
    #[arg(long)]
    vehicle: String,

    /// Shutter instant, RFC 3339. Defaults to now.
    #[arg(long)]
    recorded_at: Option<DateTime<Utc>>,

    /// Opaque reference to an already-captured photo.
    #[arg(long)]
    photo_ref: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = cli.config;

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.clone()));
    if config.log_format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let result = match cli.command {
        Commands::Record(args) => record(&config, args).await,
        Commands::Run => run(config).await,
        Commands::Status => status(&config).await,
    };
    if let Err(e) = result {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn record(config: &Config, args: RecordArgs) -> anyhow::Result<()> {
    let vehicle: VehicleType =
        args.vehicle.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let store = LocalStore::open(&config.store_dir)?;
    let now = Utc::now();
    let recorded_at = args.recorded_at.unwrap_or(now);

    let passage = build_local_passage(config, &args.plate, vehicle, recorded_at, args.photo_ref);
    if passage.plate_number.is_empty() {
        anyhow::bail!("plate {:?} has no canonical form", args.plate);
    }
    store.record(passage.clone(), now).await?;
    println!("recorded {} as {}", passage.plate_number, passage.client_id);

    // Recording always succeeds; the local match is best-effort extra.
    let matcher = LocalMatcher::new(config.segment(), config.checkpost_id.clone());
    if let Some(alert) = matcher.check(&store, &passage).await {
        println!(
            "local alert: {:?} — {} travelled {:.1} min (threshold {:.1})",
            alert.kind, alert.plate_number, alert.travel_time_minutes, alert.threshold_minutes
        );
    }
    Ok(())
}

async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(LocalStore::open(&config.store_dir)?);
    let sms: Option<Arc<dyn SmsSender>> = config
        .sms_send_command
        .clone()
        .map(|cmd| Arc::new(CommandSender::new(cmd)) as Arc<dyn SmsSender>);
    let engine = SyncEngine::new(config, store, sms)?;

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    tracing::info!("sync engine running");
    engine.run(shutdown).await;
    Ok(())
}

async fn status(config: &Config) -> anyhow::Result<()> {
    let store = LocalStore::open(&config.store_dir)?;
    let counts = store.counts().await;
    let cache = store.remote_cache_len().await;
    let status = serde_json::json!({
        "queue": counts,
        "remote_cache": cache,
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
