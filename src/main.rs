//! edgeguard server binary.
//!
//! Serves a minimal router behind the admission gate and manages its
//! lifecycle.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ primary listener ─▶ trace/timeout ─▶ admission gate ─▶ handler
//!                                                              │
//!                                                              ▼
//!                                                     window store (per key)
//!
//!     Plaintext ────▶ redirect listener ─▶ 301 https://host:port/path
//!
//!     SIGTERM/SIGINT/SIGHUP ─▶ Shutdown ─▶ drain ─▶ Stopped
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use clap::Parser;

use edgeguard::config::{load_config, ServeConfig};
use edgeguard::lifecycle::{signals, LifecycleManager, Shutdown};
use edgeguard::observability::{logging, metrics};
use edgeguard::security::{AdmissionGate, MemoryStore};

#[derive(Parser, Debug)]
#[command(name = "edgeguard")]
#[command(about = "HTTP server with sliding-window admission control", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Shut down automatically after this many seconds.
    #[arg(long, value_name = "SECS")]
    test_mode: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServeConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(secs) = cli.test_mode {
        config.lifecycle.test_mode_secs = Some(secs);
    }

    logging::init(&config.observability);
    tracing::info!("edgeguard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        redirect = config.listener.redirect,
        rate_limit = config.rate_limit.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let app = build_app(&config, &shutdown)?;

    signals::install(shutdown.clone());

    let handle = LifecycleManager::new(config, shutdown).start(app).await?;
    tracing::info!(address = %handle.local_addr(), "Ready to serve");

    handle.stopped().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

fn build_app(config: &ServeConfig, shutdown: &Shutdown) -> Result<Router, edgeguard::Error> {
    let app = Router::new()
        .route("/", get(|| async { "edgeguard" }))
        .route("/healthz", get(|| async { "ok" }));

    if !config.rate_limit.enabled {
        return Ok(app);
    }

    let store = Arc::new(MemoryStore::new());
    let gate = AdmissionGate::from_config(&config.rate_limit, store.clone())?;
    if let Some(max_period) = gate.max_period() {
        store.spawn_purge_task(
            Duration::from_secs(config.rate_limit.purge_interval_secs),
            max_period,
            shutdown.token(),
        );
    }

    Ok(gate.protect(app))
}
