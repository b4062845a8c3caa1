use super::clients_bundle::Clients;
use crate::download::DownloadEngine;
use crate::events::EventBus;
use crate::persistence::Store;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Context provided to jobs during execution.
///
/// Contains references to shared resources and a cancellation token
/// for graceful shutdown handling.
#[derive(Clone)]
pub struct JobContext {
    /// Token to check for cancellation/shutdown requests.
    pub cancellation_token: CancellationToken,

    /// Access to wishlist/queue/download-task state.
    pub store: Arc<Store>,

    /// External service adapters (recommender, library, slskd, ...).
    pub clients: Arc<Clients>,

    /// Event bus jobs publish progress/status updates to.
    pub events: Arc<EventBus>,

    /// The download state machine, driven forward by the download-driver job.
    pub downloads: Arc<DownloadEngine>,
}

impl JobContext {
    /// Create a new job context with the given dependencies.
    pub fn new(
        cancellation_token: CancellationToken,
        store: Arc<Store>,
        clients: Arc<Clients>,
        events: Arc<EventBus>,
        downloads: Arc<DownloadEngine>,
    ) -> Self {
        Self {
            cancellation_token,
            store,
            clients,
            events,
            downloads,
        }
    }

    /// Check if cancellation has been requested.
    ///
    /// Jobs should periodically check this during long-running operations
    /// and return early with `JobError::Cancelled` if true.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}
