//! Keeps `job_audit_log` from growing without bound by deleting rows
//! older than a configured retention window.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct AuditLogPruningConfig {
    pub retention_secs: i64,
    pub interval: Duration,
}

pub struct AuditLogPruningJob {
    config: AuditLogPruningConfig,
}

impl AuditLogPruningJob {
    pub fn new(config: AuditLogPruningConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackgroundJob for AuditLogPruningJob {
    fn id(&self) -> &'static str {
        "audit-log-pruning"
    }

    fn name(&self) -> &'static str {
        "Audit Log Pruning"
    }

    fn description(&self) -> &'static str {
        "Deletes job audit log entries older than the retention window"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.config.interval)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let deleted = ctx
            .store
            .cleanup_old_job_audit_entries(self.config.retention_secs)
            .await
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        debug!("audit-log-pruning deleted {} stale entries", deleted);
        Ok(())
    }
}
