//! Bridge service binary.
//!
//! Wires a subscriber store (flat file or SQLite, chosen by configuration)
//! into the bridge facade, serves the admin API, and drains in-flight
//! deliveries on shutdown.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use tracing::info;

use bridge_core::{BroadcastPublisher, RealClock};
use bridge_delivery::{Bridge, ClientConfig};
use bridge_store::{FileStore, SqliteStore, SubscriberStore};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("starting event bridge");

    let config = Config::from_env()?;
    info!(
        backend = %config.backend_name(),
        addr = %config.addr,
        "configuration loaded"
    );

    let store = open_store(&config).await?;

    let bridge = Arc::new(
        Bridge::new(
            store,
            Arc::new(BroadcastPublisher::default()),
            Arc::new(RealClock::new()),
            ClientConfig::default(),
        )
        .context("failed to construct bridge")?,
    );

    let server_handle = tokio::spawn({
        let bridge = bridge.clone();
        let addr = config.addr;
        async move {
            if let Err(e) = bridge_api::start_server(bridge, addr).await {
                tracing::error!(error = %e, "admin API server failed");
            }
        }
    });

    info!(addr = %config.addr, "bridge is ready");

    shutdown_signal().await;
    info!("shutdown signal received");

    // Stop accepting work, then give in-flight deliveries a bounded window
    // to reach a terminal outcome. Whatever is still sleeping on a backoff
    // timer is abandoned (the accepted restart gap).
    server_handle.abort();
    bridge.shutdown();

    let drain_deadline = std::time::Instant::now() + Duration::from_secs(10);
    while bridge.pending_deliveries() > 0 && std::time::Instant::now() < drain_deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let abandoned = bridge.pending_deliveries();
    if abandoned > 0 {
        info!(abandoned, "shutdown drain window expired");
    }

    info!("bridge shutdown complete");
    Ok(())
}

/// Initializes tracing with environment-based configuration.
fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,bridge=debug"))
        .expect("invalid RUST_LOG environment variable");

    let fmt_layer = fmt::layer().with_target(true).with_file(true).with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Opens the configured store backend.
async fn open_store(config: &Config) -> Result<Arc<dyn SubscriberStore>> {
    match &config.backend {
        StoreBackend::File { path } => {
            let store = FileStore::open(path)
                .await
                .with_context(|| format!("failed to open file store at {}", path.display()))?;
            Ok(Arc::new(store))
        },
        StoreBackend::Sqlite { path } => {
            let store = SqliteStore::open(path)
                .await
                .with_context(|| format!("failed to open SQLite store at {}", path.display()))?;
            Ok(Arc::new(store))
        },
    }
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received CTRL+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

/// Store backend selection.
enum StoreBackend {
    /// Flat durable JSON file.
    File { path: PathBuf },
    /// Local SQLite database.
    Sqlite { path: PathBuf },
}

/// Service configuration.
struct Config {
    backend: StoreBackend,
    addr: SocketAddr,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// `BRIDGE_STORE` selects the backend (`file`, the default, or
    /// `sqlite`); `BRIDGE_STORE_PATH` / `BRIDGE_DATABASE_PATH` override the
    /// data locations; `BRIDGE_ADDR` sets the admin API bind address.
    fn from_env() -> Result<Self> {
        let backend = match std::env::var("BRIDGE_STORE").as_deref() {
            Err(_) | Ok("file") => StoreBackend::File {
                path: std::env::var("BRIDGE_STORE_PATH")
                    .unwrap_or_else(|_| "bridge-data/subscribers.json".to_string())
                    .into(),
            },
            Ok("sqlite") => StoreBackend::Sqlite {
                path: std::env::var("BRIDGE_DATABASE_PATH")
                    .unwrap_or_else(|_| "bridge-data/bridge.db".to_string())
                    .into(),
            },
            Ok(other) => bail!("unknown BRIDGE_STORE backend: {other}"),
        };

        let addr = std::env::var("BRIDGE_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
            .parse()
            .context("invalid BRIDGE_ADDR format")?;

        Ok(Self { backend, addr })
    }

    fn backend_name(&self) -> &'static str {
        match &self.backend {
            StoreBackend::File { .. } => "file",
            StoreBackend::Sqlite { .. } => "sqlite",
        }
    }
}
