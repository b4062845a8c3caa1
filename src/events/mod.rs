//! The event bus.
//!
//! Three `tokio::sync::broadcast` channels, one per namespace, so
//! interested subscribers (a WebSocket layer, a log sink) can watch
//! queue/wishlist/download activity without the producers knowing who's
//! listening. Delivery is best-effort and non-blocking: a slow
//! subscriber lags and drops events rather than stalling a producer,
//! which is exactly `broadcast`'s built-in behavior.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum QueueEvent {
    #[serde(rename = "queue:item:added")]
    ItemAdded { id: i64 },
    #[serde(rename = "queue:item:updated")]
    ItemUpdated { id: i64 },
    #[serde(rename = "queue:stats:updated")]
    StatsUpdated { pending: i64, approved: i64, rejected: i64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    #[serde(rename = "download:task:created")]
    TaskCreated { id: String },
    #[serde(rename = "download:task:updated")]
    TaskUpdated { id: String, status: String },
    #[serde(rename = "download:progress")]
    Progress { id: String, files_completed: i64, files_total: i64, bytes_transferred: i64, bytes_total: i64 },
    #[serde(rename = "download:stats:updated")]
    StatsUpdated { active: i64, queued: i64, completed: i64, failed: i64 },
    #[serde(rename = "download:pending_selection")]
    PendingSelection { id: String },
    #[serde(rename = "download:selection_expired")]
    SelectionExpired { id: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum JobEvent {
    #[serde(rename = "job:started")]
    Started { job_id: String, run_id: i64 },
    #[serde(rename = "job:progress")]
    Progress { job_id: String, current: Option<u64>, total: Option<u64> },
    #[serde(rename = "job:completed")]
    Completed { job_id: String, duration_ms: i64 },
    #[serde(rename = "job:failed")]
    Failed { job_id: String, error: String, duration_ms: i64 },
    #[serde(rename = "job:cancelled")]
    Cancelled { job_id: String, duration_ms: i64 },
}

pub struct EventBus {
    queue_tx: broadcast::Sender<QueueEvent>,
    downloads_tx: broadcast::Sender<DownloadEvent>,
    jobs_tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (queue_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (downloads_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (jobs_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { queue_tx, downloads_tx, jobs_tx }
    }

    pub fn subscribe_queue(&self) -> broadcast::Receiver<QueueEvent> {
        self.queue_tx.subscribe()
    }

    pub fn subscribe_downloads(&self) -> broadcast::Receiver<DownloadEvent> {
        self.downloads_tx.subscribe()
    }

    pub fn subscribe_jobs(&self) -> broadcast::Receiver<JobEvent> {
        self.jobs_tx.subscribe()
    }

    pub fn emit_queue(&self, event: QueueEvent) {
        if self.queue_tx.send(event).is_err() {
            trace!("no queue event subscribers");
        }
    }

    pub fn emit_download(&self, event: DownloadEvent) {
        if self.downloads_tx.send(event).is_err() {
            trace!("no download event subscribers");
        }
    }

    pub fn emit_job(&self, event: JobEvent) {
        if self.jobs_tx.send(event).is_err() {
            trace!("no job event subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_jobs();
        bus.emit_job(JobEvent::Started { job_id: "recommender-fetch".into(), run_id: 1 });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, JobEvent::Started { run_id: 1, .. }));
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit_queue(QueueEvent::StatsUpdated { pending: 0, approved: 0, rejected: 0 });
    }
}
