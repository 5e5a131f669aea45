//! Producer binary.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reel_producer::{FolderWatcher, ProducerConfig, WatcherConfig};
use reel_transfer::{TransferClient, TransferClientConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ProducerConfig::from_env().with_args(&args)?;

    let consumer = config.resolve_consumer()?;
    tokio::fs::create_dir_all(&config.source_folder)
        .await
        .with_context(|| format!("Failed to create {}", config.source_folder.display()))?;
    let folder = tokio::fs::canonicalize(&config.source_folder).await?;

    info!(
        "Starting reel-producer: folder={}, consumer={}",
        folder.display(),
        consumer
    );

    let client = TransferClient::new(TransferClientConfig::for_address(&consumer).with_env_overrides())?;
    let watcher = Arc::new(FolderWatcher::new(
        folder,
        Arc::new(client),
        WatcherConfig::from(&config),
    ));

    tokio::select! {
        _ = watcher.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Received shutdown signal");
        }
    }

    info!("Producer stopped");
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
