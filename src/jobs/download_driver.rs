//! Turns unprocessed wishlist items into download tasks and advances
//! the download engine's state machine.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct DownloadDriverConfig {
    pub interval: Duration,
}

pub struct DownloadDriverJob {
    config: DownloadDriverConfig,
}

impl DownloadDriverJob {
    pub fn new(config: DownloadDriverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackgroundJob for DownloadDriverJob {
    fn id(&self) -> &'static str {
        "download-driver"
    }

    fn name(&self) -> &'static str {
        "Download Driver"
    }

    fn description(&self) -> &'static str {
        "Picks up unprocessed wishlist items and advances in-flight downloads"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.config.interval)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let items = ctx
            .store
            .list_wishlist_items()
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        for item in items.into_iter().filter(|i| i.processed_at.is_none()) {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let key = item.wishlist_key();
            let has_task = ctx
                .store
                .get_download_task_by_wishlist_key(&key)
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                .is_some();
            if has_task {
                continue;
            }
            debug!("download-driver picking up wishlist item {}", item.id);
            ctx.downloads
                .pick_up(item.id.clone(), key)
                .await
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        }

        ctx.downloads.tick().await.map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        Ok(())
    }
}
