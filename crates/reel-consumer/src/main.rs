//! Consumer server binary.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_consumer::{create_router, metrics, AppState, ConsumerConfig};
use reel_worker::JobExecutor;

/// How long open connections (mostly event streams) get to close after shutdown.
const CONNECTION_DRAIN: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting reel-consumer");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ConsumerConfig::from_env().with_args(&args)?;
    info!(
        "Consumer config: bind={}, workers={}, queue_capacity={}, producers={}",
        config.bind_address(),
        config.worker.max_concurrent_jobs,
        config.queue.capacity,
        config.num_producers
    );

    let state = AppState::new(config.clone()).context("Failed to create application state")?;
    state
        .prepare_directories()
        .await
        .context("Failed to create data directories")?;

    match reel_media::check_ffmpeg() {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(e) => warn!("{}; every job will fail until ffmpeg is installed", e),
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics()?)
    } else {
        None
    };
    tokio::spawn(metrics::track_queue_events(state.hub().clone()));

    let executor = Arc::new(JobExecutor::with_ffmpeg(
        config.worker.clone(),
        Arc::clone(&state.scheduler),
    )?);
    let worker = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move { executor.run().await })
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("Invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let mut graceful_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.wait_for(|stop| *stop).await;
        })
        .into_future();

    let mut drain_rx = shutdown_rx;
    tokio::select! {
        result = server => result.context("Server error")?,
        _ = async {
            let _ = drain_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(CONNECTION_DRAIN).await;
        } => warn!("Connections still open after {:?}, closing", CONNECTION_DRAIN),
    }

    executor.shutdown();
    match worker.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Job executor failed: {}", e),
        Err(e) => error!("Job executor task panicked: {}", e),
    }

    info!("Consumer shutdown complete");
    Ok(())
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
