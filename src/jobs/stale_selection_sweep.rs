//! A thin, more-frequent wrapper around the download engine's
//! selection-expiry check, so a task parked in `pending_selection`
//! doesn't wait for the driver's normal interval before falling back
//! to auto-select.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule, ShutdownBehavior};
use crate::persistence::DownloadStatus;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone)]
pub struct StaleSelectionSweepConfig {
    pub interval: Duration,
}

pub struct StaleSelectionSweepJob {
    config: StaleSelectionSweepConfig,
}

impl StaleSelectionSweepJob {
    pub fn new(config: StaleSelectionSweepConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackgroundJob for StaleSelectionSweepJob {
    fn id(&self) -> &'static str {
        "stale-selection-sweep"
    }

    fn name(&self) -> &'static str {
        "Stale Selection Sweep"
    }

    fn description(&self) -> &'static str {
        "Expires selection windows that have been left pending too long"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.config.interval)
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        ctx.downloads.tick().await.map_err(|e| JobError::ExecutionFailed(e.to_string()))
    }

    async fn execute_with_params(&self, ctx: &JobContext, params: Option<JsonValue>) -> Result<(), JobError> {
        let dry_run = params
            .as_ref()
            .and_then(|p| p.get("dry_run"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !dry_run {
            return self.execute(ctx).await;
        }

        let pending = ctx
            .store
            .list_download_tasks_by_status(DownloadStatus::PendingSelection)
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();
        let expired = pending
            .iter()
            .filter(|t| t.selection_expires_at.map(|exp| exp <= now).unwrap_or(false))
            .count();
        info!("stale-selection-sweep dry run: {} of {} pending selections have expired", expired, pending.len());
        Ok(())
    }
}
