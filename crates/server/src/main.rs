use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convertino_core::{
    load_config, load_default_config, validate_config, ByteConverter, Config, ConversionManager,
    DocumentCache, DocumentLibrary, FsFileStore,
};
use convertino_server::api::create_router;
use convertino_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the config file
const CONFIG_ENV: &str = "CONVERTINO_CONFIG";

/// Config file used when the environment names none
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Loads the configuration named by `CONVERTINO_CONFIG`, then `config.toml`,
/// then built-in defaults.
fn resolve_config() -> Result<(Config, Option<PathBuf>)> {
    let explicit = std::env::var(CONFIG_ENV).ok().map(PathBuf::from);
    let config_path = explicit.or_else(|| {
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        fallback.exists().then_some(fallback)
    });

    let config = match &config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => load_default_config().context("Failed to load default config")?,
    };

    validate_config(&config).context("Configuration validation failed")?;
    Ok((config, config_path))
}

async fn run() -> Result<()> {
    let resolved = resolve_config();
    init_logging(resolved.as_ref().is_ok_and(|(c, _)| c.logging.json));
    let (config, config_path) = resolved?;

    match &config_path {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("No config file found, using defaults"),
    }

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(version = VERSION, config_hash = &config_hash[..16], "Starting convertino");

    let documents_dir = config.storage.documents_dir.clone();
    tokio::fs::create_dir_all(&documents_dir)
        .await
        .with_context(|| format!("Failed to create documents directory {:?}", documents_dir))?;
    info!("Documents directory: {:?}", documents_dir);

    // Conversion engine and manager
    let converter = Arc::new(ByteConverter::new(config.converter.clone()));
    let (manager, manager_handle) = ConversionManager::spawn(converter);
    info!("Conversion manager started");

    // Library, restored from the cache
    let cache = DocumentCache::new(&documents_dir, &config.storage.cache_file_name);
    let library = Arc::new(DocumentLibrary::new(
        Arc::new(FsFileStore::new()),
        cache,
        manager.clone(),
    ));
    let restored = library.restore().await;
    info!(restored, "Document library ready");

    let persistence_handle = library.spawn_persistence();

    let state = Arc::new(AppState::new(config.clone(), Arc::clone(&library)));
    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");

    // Running conversions end as idle; the final save records that
    if let Err(e) = manager.shutdown().await {
        warn!("Conversion manager already stopped: {}", e);
    }
    let _ = manager_handle.await;
    info!("Conversion manager stopped");

    if let Err(e) = library.persist().await.await {
        warn!("Final cache save did not complete: {}", e);
    }
    persistence_handle.abort();
    info!("Document cache saved");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
