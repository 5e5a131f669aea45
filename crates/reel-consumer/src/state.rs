//! Application state.

use std::sync::Arc;

use reel_media::ArtifactLayout;
use reel_queue::{Scheduler, StatusHub};

use crate::config::ConsumerConfig;
use crate::drop_folder::DropRouter;
use crate::error::ApiResult;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ConsumerConfig,
    pub scheduler: Arc<Scheduler>,
    pub layout: Arc<ArtifactLayout>,
    pub drops: Arc<DropRouter>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ConsumerConfig) -> ApiResult<Self> {
        let scheduler = Scheduler::new(config.queue.clone())?;
        Ok(Self::with_scheduler(config, Arc::new(scheduler)))
    }

    /// Create state around an existing scheduler.
    pub fn with_scheduler(config: ConsumerConfig, scheduler: Arc<Scheduler>) -> Self {
        let layout = ArtifactLayout::new(&config.worker.data_dir);
        let drops = DropRouter::new(config.producer_folders());
        Self {
            config,
            scheduler,
            layout: Arc::new(layout),
            drops: Arc::new(drops),
        }
    }

    pub fn hub(&self) -> &StatusHub {
        self.scheduler.hub()
    }

    /// Create the artifact directories and the producer drop folders.
    pub async fn prepare_directories(&self) -> ApiResult<()> {
        self.layout.ensure().await?;
        self.drops.ensure().await?;
        Ok(())
    }
}
