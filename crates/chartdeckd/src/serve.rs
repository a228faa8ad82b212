//! `chartdeckd serve`: wire the subsystems together and run until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;

use chartdeck_blob::ChartStore;
use chartdeck_core::DaemonConfig;
use chartdeck_orchestrator::{Cancellation, Orchestrator, OrchestratorContext};
use chartdeck_state::ProjectStore;
use chartdeck_trigger::JenkinsTrigger;
use tokio::sync::watch;
use tracing::info;

pub async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    info!("Chartdeck daemon starting");

    // ── Stores and trigger ─────────────────────────────────────

    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join("chartdeck.redb");
    let records = ProjectStore::open(&db_path)?;
    info!(path = ?db_path, "record store opened");

    let charts = ChartStore::new(&config.storage)?;
    let trigger = JenkinsTrigger::new(&config.trigger)?;
    info!(url = %config.trigger.url, "build trigger configured");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let orchestrator = Orchestrator::new(OrchestratorContext {
        records: Arc::new(records),
        charts,
        trigger: Arc::new(trigger),
        polling: config.poll,
        cancel: Cancellation::new(shutdown_rx.clone()),
    });

    // ── Background tasks ───────────────────────────────────────

    let sweeper = orchestrator.clone();
    let sweep_config = config.sweep;
    let sweep_handle = tokio::spawn(async move {
        sweeper.run_sweeper(sweep_config, shutdown_rx).await;
    });

    // ── API server ─────────────────────────────────────────────

    let router = chartdeck_api::build_router(orchestrator, &config.cors);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = sweep_handle.await;

    info!("Chartdeck daemon stopped");
    Ok(())
}
