use anyhow::{Context, Result};
use sensorsheet::{config::AppConfig, server, source::MySqlSource};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config ───────────────────────────────────────────────────
    let cfg = AppConfig::load().context("loading configuration")?;

    // ─── 2) init logging ─────────────────────────────────────────────
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(cfg.log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();
    info!(config = ?cfg, "startup");

    // ─── 3) database ─────────────────────────────────────────────────
    let source = MySqlSource::connect(&cfg.database)
        .await
        .with_context(|| format!("connecting to {}:{}", cfg.database.host, cfg.database.port))?;

    // ─── 4) serve until ctrl-c ───────────────────────────────────────
    let state = Arc::new(server::AppState::new(
        Arc::new(source.clone()),
        cfg.chunk_size,
    ));
    let (addr, serving) = warp::serve(server::routes(state))
        .try_bind_with_graceful_shutdown(([0, 0, 0, 0], cfg.port), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            info!("shutdown requested");
        })
        .with_context(|| format!("binding port {}", cfg.port))?;

    info!("listening on http://{}", addr);
    info!("export endpoint: GET http://localhost:{}/export?table=...", cfg.port);
    serving.await;

    source.close().await;
    info!("database pool closed");
    Ok(())
}
