//! Beamline Datastore
//!
//! Retention service for beamline experiment datasets:
//! - Dataset registration against User Portal visits
//! - Per-beamline retention policies with type/organisation exclusions
//! - Lifecycle commands (renew, drop, delete) and storage events
//! - Background expiry sweep

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use dataset_service::DatasetService;
use dataset_store::{StoreBackend, StoreConfig};
use portal_client::PortalConfig;
use retention_core::LocalZone;
use telemetry::{health, init_tracing_from_env};
use worker::{WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// IANA zone name or fixed UTC offset for local timestamps
    #[serde(default = "default_timezone")]
    timezone: String,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    portal: PortalConfig,

    #[serde(default)]
    worker: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timezone() -> String {
    "Australia/Melbourne".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timezone: default_timezone(),
            store: StoreConfig::default(),
            portal: PortalConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Beamline Datastore v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;
    let zone: LocalZone = config
        .timezone
        .parse()
        .context("Invalid timezone")?;

    info!(
        backend = ?config.store.backend,
        path = %config.store.path,
        timezone = %config.timezone,
        "Loaded configuration"
    );
    if config.store.backend == StoreBackend::Memory {
        warn!("Using in-memory store, datasets are lost on restart");
    }

    let stores = dataset_store::open(&config.store).context("Failed to open dataset store")?;
    let visits =
        portal_client::provider(&config.portal).context("Failed to create portal client")?;

    let service = Arc::new(DatasetService::new(stores.datasets, stores.policies, visits));

    check_health(&config, &service).await;

    let scheduler = Arc::new(WorkerScheduler::new(config.worker.clone(), service.clone()));
    let worker_handles = scheduler.start();

    let app = router(AppState::new(service, zone));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");
    for handle in worker_handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("DATASTORE")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // The config crate splits underscored field names on the separator,
    // so nested settings are also read by hand
    if let Ok(path) = std::env::var("DATASTORE_STORE_PATH") {
        config.store.path = path;
    }
    if let Ok(backend) = std::env::var("DATASTORE_STORE_BACKEND") {
        config.store.backend = match backend.to_ascii_lowercase().as_str() {
            "sqlite" => StoreBackend::Sqlite,
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("Unknown store backend '{}'", other),
        };
    }
    if let Ok(url) = std::env::var("DATASTORE_PORTAL_URL") {
        config.portal.url = url;
    }
    if let Ok(client) = std::env::var("DATASTORE_PORTAL_CLIENT") {
        config.portal.client = client;
    }
    if let Ok(password) = std::env::var("DATASTORE_PORTAL_PASSWORD") {
        config.portal.password = password;
    }
    if let Ok(fixtures) = std::env::var("DATASTORE_PORTAL_FIXTURES") {
        config.portal.fixtures = Some(fixtures);
    }
    if let Ok(secs) = std::env::var("DATASTORE_WORKER_EXPIRY_INTERVAL_SECS") {
        config.worker.expiry_interval_secs = secs
            .parse()
            .context("DATASTORE_WORKER_EXPIRY_INTERVAL_SECS must be an integer")?;
    }
    if let Ok(tz) = std::env::var("DATASTORE_TIMEZONE") {
        config.timezone = tz;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(config: &Config, service: &DatasetService) {
    match service.ping().await {
        Ok(()) => {
            health().store.set_healthy();
            info!("Dataset store: healthy");
        }
        Err(e) => {
            health().store.set_unhealthy(e.to_string());
            error!("Dataset store: unhealthy: {}", e);
        }
    }

    // A remote portal reports its health on first use
    if config.portal.is_mock() {
        health().portal.set_healthy();
        info!("User portal: static provider");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
