use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use mediasync_config::{ConfigLoad, ConfigLoader};
use mediasync_core::infra::{
    CatalogFilePipeline, InMemoryCanonicalRepository, InMemoryRawRepository,
    RawStoreRegistry,
};
use mediasync_core::model::{SyncPhase, SyncRunMetrics, SyncStatus};
use mediasync_core::{
    CatalogSyncOrchestrator, RawCatalogRepository, ScanRequest, SyncConfig,
    SyncMode,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mediasyncctl", about = "Run and inspect MediaSync catalog syncs")]
struct Cli {
    /// Env file read before settings are resolved (defaults to ./.env if present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a catalog dump (JSON array or NDJSON) into in-memory stores
    Sync {
        /// Source name the items are recorded under (telegram, xtream, ...)
        #[arg(long)]
        source: String,
        /// Catalog dump to read
        #[arg(long)]
        file: PathBuf,
        /// Restrict the scan to these phases (live, movies, series, episodes)
        #[arg(long, value_delimiter = ',')]
        phases: Vec<SyncPhase>,
        /// Restrict Telegram items to these chats
        #[arg(long = "chat-id")]
        chat_ids: Vec<i64>,
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,
        /// Use one batch size for every phase
        #[arg(long)]
        batch_size: Option<usize>,
        /// Persist raw items only
        #[arg(long)]
        no_link: bool,
        /// Route episodes to their own phase
        #[arg(long)]
        separate_episodes: bool,
        /// Print statuses and metrics as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Load and validate settings, then print the effective configuration
    CheckConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Batched,
    Channel,
}

impl From<ModeArg> for SyncMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Batched => SyncMode::Batched,
            ModeArg::Channel => SyncMode::Channel,
        }
    }
}

struct SyncArgs {
    source: String,
    file: PathBuf,
    phases: Vec<SyncPhase>,
    chat_ids: Vec<i64>,
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut loader = ConfigLoader::new();
    if let Some(path) = cli.env_file {
        loader = loader.with_env_file(path);
    }
    let load = loader.load()?;

    match cli.command {
        Command::Sync {
            source,
            file,
            phases,
            chat_ids,
            mode,
            batch_size,
            no_link,
            separate_episodes,
            json,
        } => {
            let mut config = load.settings.sync.clone();
            if let Some(mode) = mode {
                config.mode = mode.into();
            }
            if batch_size.is_some() {
                config.batch_size = batch_size;
            }
            if no_link {
                config.enable_canonical_linking = false;
            }
            if separate_episodes {
                config.separate_episode_phase = true;
            }

            let args = SyncArgs {
                source,
                file,
                phases,
                chat_ids,
                json,
            };
            run_sync(&load, args, config).await
        }
        Command::CheckConfig => check_config(&load),
    }
}

fn check_config(load: &ConfigLoad) -> Result<()> {
    println!("# source: {:?}", load.source);
    println!("# env file loaded: {}", load.env_file_loaded);
    for warning in load.warnings.iter() {
        println!("# warning: {warning}");
    }
    print!("{}", load.settings.to_toml()?);
    Ok(())
}

async fn run_sync(load: &ConfigLoad, args: SyncArgs, config: SyncConfig) -> Result<()> {
    if !args.file.exists() {
        bail!("catalog file {} does not exist", args.file.display());
    }

    let mut registry = RawStoreRegistry::new();
    let mut stores = Vec::new();
    registry.register_all_phases(&args.source, |phase| {
        let store = Arc::new(InMemoryRawRepository::new());
        stores.push((phase, store.clone()));
        store as Arc<dyn RawCatalogRepository>
    });
    let canonical = Arc::new(InMemoryCanonicalRepository::new());

    let orchestrator = CatalogSyncOrchestrator::builder()
        .pipeline(Arc::new(CatalogFilePipeline::new(
            args.source.clone(),
            args.file.clone(),
        )))
        .raw_stores(registry)
        .canonical_repository(canonical.clone())
        .batch_policy(load.settings.batch_policy())
        .memory_monitor(load.settings.memory_monitor())
        .build()
        .context("failed to wire the orchestrator")?;

    let mut request = if args.phases.is_empty() {
        ScanRequest::all()
    } else {
        ScanRequest::for_phases(args.phases)
    };
    if !args.chat_ids.is_empty() {
        request = request.with_chat_ids(args.chat_ids);
    }

    info!(
        source = %args.source,
        file = %args.file.display(),
        mode = ?config.mode,
        "starting sync"
    );
    let mut handle = orchestrator.sync(&args.source, request, config);
    let mut terminal = None;
    let mut interrupted = false;

    loop {
        tokio::select! {
            status = handle.next() => {
                let Some(status) = status else { break };
                print_status(&status, args.json)?;
                if status.is_terminal() {
                    terminal = Some(status);
                }
            }
            signal = tokio::signal::ctrl_c(), if !interrupted => {
                if let Err(err) = signal {
                    warn!(error = %err, "failed to listen for ctrl-c");
                }
                interrupted = true;
                handle.cancel();
            }
        }
    }

    let metrics = orchestrator.last_run_metrics().borrow().clone();
    if let Some(metrics) = metrics {
        print_metrics(&metrics, args.json)?;
    }
    if !args.json {
        for (phase, store) in &stores {
            let count = store.count().await?;
            if count > 0 {
                println!("  {:<8} {count} raw items", phase.as_str());
            }
        }
        println!("  canonical works: {}", canonical.len().await);
    }

    match terminal {
        Some(SyncStatus::Error { reason, message }) => {
            bail!("sync failed ({reason}): {message}")
        }
        None => bail!("sync ended without a terminal status"),
        Some(_) => Ok(()),
    }
}

fn print_status(status: &SyncStatus, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(status)?);
        return Ok(());
    }
    match status {
        SyncStatus::Started { source } => println!("started {source}"),
        SyncStatus::InProgress {
            discovered,
            persisted,
            phase,
            scan_discovered,
            scan_total,
        } => {
            let phase = phase.as_deref().unwrap_or("-");
            match (scan_discovered, scan_total) {
                (Some(done), Some(total)) => println!(
                    "progress discovered={discovered} persisted={persisted} phase={phase} scanned={done}/{total}"
                ),
                (Some(done), None) => println!(
                    "progress discovered={discovered} persisted={persisted} phase={phase} scanned={done}"
                ),
                _ => println!(
                    "progress discovered={discovered} persisted={persisted} phase={phase}"
                ),
            }
        }
        SyncStatus::Completed { total, duration_ms } => {
            println!("completed total={total} in {duration_ms}ms")
        }
        SyncStatus::Cancelled { persisted } => {
            println!("cancelled persisted={persisted}")
        }
        SyncStatus::Error { reason, message } => {
            println!("error {reason}: {message}")
        }
    }
    Ok(())
}

fn print_metrics(metrics: &SyncRunMetrics, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(metrics)?);
        return Ok(());
    }
    println!(
        "run: discovered={} persisted={} lost={} linked={} link_failures={} hint_warnings={} throttles={}",
        metrics.items_discovered,
        metrics.items_persisted,
        metrics.items_lost,
        metrics.items_linked,
        metrics.link_failures,
        metrics.hint_warnings,
        metrics.throttle_events,
    );
    for (phase, phase_metrics) in &metrics.phases {
        println!(
            "  {:<8} batches={} (size={} time={} final={}) persist_ms={}",
            phase.as_str(),
            phase_metrics.batches,
            phase_metrics.size_flushes,
            phase_metrics.time_flushes,
            phase_metrics.final_flushes,
            phase_metrics.persist_time_ms,
        );
    }
    if let Some(channel) = &metrics.channel {
        println!(
            "  channel sent={} received={} backpressure={}",
            channel.items_sent, channel.items_received, channel.backpressure_events
        );
    }
    Ok(())
}
