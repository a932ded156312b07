use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pulseboard::{
    Dashboard, HttpSource, SchedulerHandle, Settings, SyncOrchestrator,
    config::{Config, StorageConfig, resolve_interval_ms},
    render::spawn_log_renderer,
    storage::{MemoryBackend, SettingsBackend},
    util,
};
use tracing::{info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Live telemetry dashboard")]
struct Args {
    /// Config file (default: ~/.config/pulseboard/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides PULSEBOARD_URL and the config file
    #[arg(short, long)]
    url: Option<String>,

    /// Poll interval in milliseconds, overrides every other source
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Log level for the dashboard
    #[arg(long, default_value = "debug")]
    log_level: LevelFilter,
}

fn init(level: LevelFilter) {
    let filter = filter::Targets::new().with_targets(vec![
        ("pulseboard", level),
        ("sqlx", LevelFilter::WARN),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

async fn open_backend(storage: &StorageConfig) -> anyhow::Result<Arc<dyn SettingsBackend>> {
    match storage {
        StorageConfig::Memory => {
            info!("settings are kept in memory only");
            Ok(Arc::new(MemoryBackend::new()))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            let backend = pulseboard::storage::sqlite::SqliteBackend::new(path)
                .await
                .with_context(|| format!("failed to open settings database {}", path.display()))?;
            Ok(Arc::new(backend))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { path } => {
            warn!(
                "built without SQLite support, {} is ignored and settings will not persist",
                path.display()
            );
            Ok(Arc::new(MemoryBackend::new()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init(args.log_level);
    trace!("started with args: {args:?}");

    let config = Config::load(args.config.as_deref())?;

    let base_url = args
        .url
        .clone()
        .or_else(util::get_base_url)
        .unwrap_or_else(|| config.base_url.clone());

    let backend = open_backend(&config.storage).await?;
    let health = backend.health_check().await?;
    if !health.healthy {
        warn!("settings backend unhealthy: {}", health.message);
    }

    let settings = Settings::new(backend.clone());
    let interval_ms = resolve_interval_ms(
        args.interval_ms,
        util::get_interval_ms(),
        settings.stored_refresh_interval_ms().await,
        config.interval_ms,
    );

    info!(
        theme = %settings.theme().await,
        high_contrast = settings.high_contrast().await,
        "loaded presentation settings"
    );

    let source = HttpSource::new(base_url.clone(), config.request_timeout())?;
    let dashboard = Dashboard::load(settings, config.alert_display_timeout()).await;
    let renderer = spawn_log_renderer(dashboard.subscribe());

    let scheduler = SchedulerHandle::spawn(
        SyncOrchestrator::new(Arc::new(source), dashboard),
        Duration::from_millis(interval_ms),
    );

    info!("polling {base_url} every {interval_ms}ms");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;

    info!("shutting down");
    scheduler.shutdown().await?;
    drop(scheduler);

    // the renderer stops once the scheduler has dropped the event channel
    if tokio::time::timeout(Duration::from_secs(2), renderer)
        .await
        .is_err()
    {
        warn!("log renderer did not stop in time");
    }

    backend.close().await?;

    Ok(())
}
