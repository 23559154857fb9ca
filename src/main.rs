use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use ranchline::api;
use ranchline::config::Config;
use ranchline::memory::store::MemoryStore;
use ranchline::memory::zep::ZepClient;
use ranchline::outbox::{self, Outbox};
use ranchline::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Tracing ────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ranchline=info,tower_http=info")),
        )
        .json()
        .init();

    tracing::info!("Ranchline starting");

    // ── Config ─────────────────────────────────────────────────────
    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!(error = %e, "startup configuration invalid");
            anyhow::bail!("{e}");
        }
    };

    tracing::info!(
        zep_base_url = %config.zep.base_url,
        port = config.server.port,
        outbox_path = %config.outbox.path.display(),
        "configuration loaded"
    );

    // ── Zep client ─────────────────────────────────────────────────
    let store: Arc<dyn MemoryStore> =
        Arc::new(ZepClient::new(config.zep.clone()).map_err(|e| anyhow::anyhow!("{e}"))?);

    // ── Outbox + drain loop ────────────────────────────────────────
    let outbox = Arc::new(Outbox::new(config.outbox.path.clone())?);
    outbox::spawn_drain_task(
        outbox.clone(),
        store.clone(),
        config.outbox.drain_interval_secs,
    );

    // ── App state ──────────────────────────────────────────────────
    let state = AppState {
        config: config.clone(),
        store,
        outbox,
    };

    // ── Router ─────────────────────────────────────────────────────
    let app = api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // ── Server ─────────────────────────────────────────────────────
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .expect("invalid server address");

    tracing::info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
