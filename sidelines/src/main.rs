/*
sidelines - single-binary main.rs
Loads configuration, wires the feed list, record store and sports-data client,
then starts the Rocket HTTP server (or runs one aggregation pass with --once).
*/

use anyhow::Result;
use clap::Parser;
use common::{init_db_pool, Config, StoreBackend};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use sidelines::aggregate::Aggregator;
use sidelines::feeds::provider_from_config;
use sidelines::model::NewsResponse;
use sidelines::server::{launch_rocket, AppState};
use sidelines::service::NewsService;
use sidelines::stats::SportsDataClient;
use sidelines::store::{ensure_schema, ContentStore, NullStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "sidelines", about = "Sidelines sports-news aggregation server")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run a single aggregation pass, print it as JSON and exit
    #[arg(long)]
    once: bool,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let store = open_store(&config).await?;
    let feeds = provider_from_config(&config)?;
    info!(feeds = %feeds.describe(), store = store.backend_name(), "feed list and store selected");

    let aggregator = Aggregator::from_config(config.fetch.as_ref())?;
    let news = NewsService::new(Arc::from(feeds), aggregator, store);

    if args.once {
        let articles = news.news().await?;
        println!("{}", serde_json::to_string_pretty(&NewsResponse { articles })?);
        return Ok(());
    }

    let sports_data = match config.sports_data.as_ref() {
        Some(cfg) => match SportsDataClient::from_config(cfg) {
            Ok(client) => {
                info!(base_url = %cfg.base_url, "sports data client initialized");
                Some(Arc::new(client))
            }
            Err(e) => {
                warn!("sports data disabled: {:#}", e);
                None
            }
        },
        None => None,
    };

    let state = AppState::new(news, sports_data);
    launch_rocket(state, config.server.as_ref()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Pick the record store once at startup. The sqlite pool lives for the whole process.
async fn open_store(config: &Config) -> Result<Arc<dyn ContentStore>> {
    match config.store_backend()? {
        StoreBackend::None => {
            info!("no record store configured; custom content disabled");
            Ok(Arc::new(NullStore))
        }
        StoreBackend::Sqlite { path } => {
            let db_path_abs = match tokio::fs::canonicalize(&path).await {
                Ok(p) => p.to_string_lossy().to_string(),
                Err(_) => path.clone(),
            };
            info!(db_path = %db_path_abs, "resolved DB path");

            let pool = init_db_pool(&db_path_abs).await.map_err(|e| {
                error!(%e, db_path = %db_path_abs, "failed to initialize database pool");
                e
            })?;

            if config
                .admin
                .as_ref()
                .and_then(|a| a.auto_migrate)
                .unwrap_or(false)
            {
                info!("Auto-migrate enabled: ensuring custom content schema");
                ensure_schema(&pool).await?;
            }

            Ok(Arc::new(SqliteStore::new(pool)))
        }
    }
}
