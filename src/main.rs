use std::future::IntoFuture;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use chairtime::engine::{run_compactor, Engine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let metrics_port: Option<u16> = std::env::var("CHAIRTIME_METRICS_PORT")
        .ok()
        .and_then(|s| s.parse().ok());
    chairtime::observability::init(metrics_port);

    let addr = std::env::var("CHAIRTIME_ADDR").unwrap_or_else(|_| "127.0.0.1:8790".into());
    let data_dir =
        std::env::var("CHAIRTIME_DATA_DIR").unwrap_or_else(|_| "./chairtime_data".into());
    let seed = std::env::var("CHAIRTIME_SEED")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let compact_threshold: u64 = std::env::var("CHAIRTIME_COMPACT_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1000);

    // Ensure data directory exists
    std::fs::create_dir_all(&data_dir)?;
    let wal_path = PathBuf::from(&data_dir).join("salon.wal");

    let engine = Arc::new(Engine::new(wal_path)?);
    let (people, services, items, appointments) = engine.entity_counts();
    info!(
        replayed = engine.replayed_events(),
        people, services, items, appointments, "engine ready"
    );

    if seed {
        chairtime::seed::seed_demo_data(&engine).await?;
    }

    tokio::spawn(run_compactor(engine.clone(), compact_threshold));

    let app = chairtime::http::router(engine.clone());
    let listener = TcpListener::bind(&addr).await?;
    info!("chairtime listening on {addr}");
    info!("  data_dir: {data_dir}");
    info!(
        "  metrics: {}",
        metrics_port.map_or("disabled".to_string(), |p| format!(
            "http://0.0.0.0:{p}/metrics"
        ))
    );

    let (drained_tx, drained_rx) = tokio::sync::oneshot::channel::<()>();
    let serve = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!("shutdown signal received, stopping accept loop");
                let _ = drained_tx.send(());
            })
            .into_future(),
    );

    let _ = drained_rx.await;

    // Let in-flight requests finish (up to 10s)
    info!("draining in-flight requests...");
    match tokio::time::timeout(std::time::Duration::from_secs(10), serve).await {
        Ok(joined) => {
            joined??;
            info!("all requests drained");
        }
        Err(_) => tracing::warn!("drain timeout, some requests still open"),
    }

    // Round-trip through the WAL writer: the channel is FIFO, so once this
    // answers, every queued append has hit disk.
    engine.wal_appends_since_compact().await;
    info!("chairtime stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
}
