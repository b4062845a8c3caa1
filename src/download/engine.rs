//! The download engine — drives every non-terminal DownloadTask
//! through one FSM step per call: pick up new work, advance in-flight
//! work, never block the caller longer than one network round trip.

use crate::clients::peer_search::{PeerResponse, PeerSearchClient, SearchState};
use crate::download::fsm::{self, Trigger};
use crate::download::retry_policy::RetryPolicy;
use crate::download::scoring::{self, ScoredCandidate, ScoringConfig};
use crate::download::search_query;
use crate::download::{file_filter, path_resolution, progress};
use crate::error::AppResult;
use crate::events::{DownloadEvent, EventBus};
use crate::persistence::{DownloadStatus, DownloadTask, Store};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Auto,
    Manual,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub selection_mode: SelectionMode,
    pub selection_timeout_hours: i64,
    pub search_timeout_ms: u64,
    pub min_responses: usize,
    pub simplify_on_retry: bool,
    pub exclude_terms: Vec<String>,
    pub scoring: ScoringConfig,
    pub file_filter: file_filter::FileFilterConfig,
    pub retry_policy: RetryPolicy,
    pub downloads_root: std::path::PathBuf,
}

pub struct DownloadEngine {
    store: Arc<Store>,
    events: Arc<EventBus>,
    peers: PeerSearchClient,
    config: EngineConfig,
}

impl DownloadEngine {
    pub fn new(store: Arc<Store>, events: Arc<EventBus>, peers: PeerSearchClient, config: EngineConfig) -> Self {
        Self { store, events, peers, config }
    }

    /// Creates a `pending` DownloadTask for every WishlistItem that
    /// doesn't already have one (driven by `jobs::download_driver`).
    pub async fn pick_up(&self, wishlist_item_id: String, wishlist_key: String) -> AppResult<()> {
        let task = DownloadTask {
            id: uuid::Uuid::new_v4().to_string(),
            wishlist_item_id,
            wishlist_key,
            status: DownloadStatus::Pending,
            search_query: None,
            search_results: None,
            selection_expires_at: None,
            skipped_usernames: Vec::new(),
            peer_username: None,
            peer_directory: None,
            file_count: None,
            expected_track_count: None,
            quality_tier: None,
            quality_format: None,
            quality_bit_rate: None,
            quality_bit_depth: None,
            quality_sample_rate: None,
            download_path: None,
            error_message: None,
            retry_count: 0,
            queued_at: chrono::Utc::now().timestamp(),
            started_at: None,
            completed_at: None,
            organized_at: None,
        };
        self.store.insert_download_task(task.clone()).await?;
        self.events.emit_download(DownloadEvent::TaskCreated { id: task.id });
        Ok(())
    }

    /// Advances every non-terminal task by one FSM step.
    pub async fn tick(&self) -> AppResult<()> {
        for status in [
            DownloadStatus::Pending,
            DownloadStatus::Searching,
            DownloadStatus::PendingSelection,
            DownloadStatus::Deferred,
            DownloadStatus::Queued,
            DownloadStatus::Downloading,
        ] {
            for task in self.store.list_download_tasks_by_status(status)? {
                if let Err(err) = self.step(task.clone()).await {
                    warn!(task_id = %task.id, error = %err, "download task step failed");
                }
            }
        }
        Ok(())
    }

    async fn step(&self, task: DownloadTask) -> AppResult<()> {
        match task.status {
            DownloadStatus::Pending => self.start_search(task).await,
            DownloadStatus::Searching => self.drive_search(task).await,
            DownloadStatus::PendingSelection => self.check_selection_expiry(task).await,
            DownloadStatus::Deferred => self.check_backoff(task).await,
            DownloadStatus::Queued => self.check_peer_ack(task).await,
            DownloadStatus::Downloading => self.reconcile_transfer(task).await,
            DownloadStatus::Completed | DownloadStatus::Failed => Ok(()),
        }
    }

    async fn start_search(&self, mut task: DownloadTask) -> AppResult<()> {
        let Some(next) = fsm::apply(task.status, Trigger::PickUp) else { return Ok(()) };
        let Some(wishlist) = self.store.get_wishlist_item(&task.wishlist_item_id)? else {
            return Ok(());
        };
        let query = search_query::album_query(&wishlist.artist, &wishlist.album, &self.config.exclude_terms, false);
        task.status = next;
        task.search_query = Some(query);
        self.persist_and_emit(task).await
    }

    async fn drive_search(&self, mut task: DownloadTask) -> AppResult<()> {
        let Some(query) = task.search_query.clone() else { return Ok(()) };
        let handle = match self
            .peers
            .search(&query, self.config.search_timeout_ms, self.config.min_responses)
            .await
        {
            Ok(h) => h,
            Err(err) => return self.fail(task, format!("peer search failed: {err}")).await,
        };

        let deadline = tokio::time::Instant::now() + crate::clients::peer_search::MAX_SEARCH_WAIT;
        loop {
            match self.peers.poll_state(&handle).await {
                Ok(SearchState::Completed) => break,
                Ok(SearchState::Cancelled) => return self.fail(task, "peer search cancelled".to_string()).await,
                Ok(SearchState::InProgress) => {
                    if tokio::time::Instant::now() >= deadline {
                        break;
                    }
                    tokio::time::sleep(crate::clients::peer_search::POLL_INTERVAL).await;
                }
                Err(err) => return self.fail(task, format!("peer search poll failed: {err}")).await,
            }
        }

        let responses = match self.peers.responses(&handle).await {
            Ok(r) => r,
            Err(err) => return self.fail(task, format!("peer search responses failed: {err}")).await,
        };
        let _ = self.peers.delete(&handle).await;

        self.score_and_branch(task, responses).await
    }

    async fn score_and_branch(&self, mut task: DownloadTask, responses: Vec<PeerResponse>) -> AppResult<()> {
        let expected = task.expected_track_count.unwrap_or(0).max(0) as usize;
        let candidates: Vec<ScoredCandidate> = scoring::rank(
            responses
                .iter()
                .filter(|r| !task.skipped_usernames.contains(&r.username))
                .filter_map(|r| scoring::score_candidate(r, expected, &self.config.scoring))
                .collect(),
        );

        if candidates.is_empty() {
            return self.fail(task, "no peer result passed the completeness threshold".to_string()).await;
        }

        task.search_results = Some(serde_json::to_value(&responses).unwrap_or(serde_json::Value::Null));

        let manual_needs_selection = self.config.selection_mode == SelectionMode::Manual && candidates.len() > 1;
        if manual_needs_selection {
            let Some(next) = fsm::apply(task.status, Trigger::SearchResultsNeedSelection) else { return Ok(()) };
            task.status = next;
            task.selection_expires_at =
                Some(chrono::Utc::now().timestamp() + self.config.selection_timeout_hours * 3600);
            self.persist_and_emit(task.clone()).await?;
            self.events.emit_download(DownloadEvent::PendingSelection { id: task.id });
            return Ok(());
        }

        let chosen = candidates[0].clone();
        let response = responses.into_iter().find(|r| r.username == chosen.username);
        self.apply_selection(task, Trigger::SearchResultsSingleOrAuto, chosen, response, None).await
    }

    /// Filters the chosen candidate's files, tells the peer to start the
    /// transfer, and advances the task to `queued`. Shared by both the
    /// automatic ranking path and the external `select()` entry point,
    /// which differ only in trigger and in whether a caller-supplied
    /// directory narrows the file filter.
    async fn apply_selection(
        &self,
        mut task: DownloadTask,
        trigger: Trigger,
        chosen: ScoredCandidate,
        response: Option<PeerResponse>,
        directory: Option<String>,
    ) -> AppResult<()> {
        let Some(next) = fsm::apply(task.status, trigger) else { return Ok(()) };

        let mut filter_config = self.config.file_filter.clone();
        if directory.is_some() {
            filter_config.directory = directory.clone();
        } else if let Some(r) = response.as_ref() {
            let accepted: Vec<&crate::clients::peer_search::PeerFile> =
                r.files.iter().filter(|f| file_filter::accept(f, &filter_config)).collect();
            filter_config.directory = file_filter::preferred_directory(&accepted);
        }
        let directory = directory.or_else(|| filter_config.directory.clone());
        let files: Vec<String> = response
            .as_ref()
            .map(|r| file_filter::filter_files(&r.files, &filter_config).into_iter().map(|f| f.filename.clone()).collect())
            .unwrap_or_default();

        if let Err(err) = self.peers.enqueue(&chosen.username, &files).await {
            return self.fail(task, format!("enqueue failed: {err}")).await;
        }

        task.status = next;
        task.peer_username = Some(chosen.username);
        task.peer_directory = directory;
        task.quality_tier = Some(chosen.quality_tier);
        task.quality_format = chosen.quality_format;
        task.quality_bit_rate = chosen.quality_bit_rate.map(|v| v as i64);
        task.quality_bit_depth = chosen.quality_bit_depth.map(|v| v as i64);
        task.quality_sample_rate = chosen.quality_sample_rate.map(|v| v as i64);
        task.file_count = Some(files.len() as i64);
        self.persist_and_emit(task).await
    }

    /// External collaborator entry point: a human picked a specific peer.
    pub async fn select(&self, task_id: &str, username: String, directory: Option<String>) -> AppResult<()> {
        let Some(mut task) = self.store.get_download_task(task_id)? else { return Ok(()) };
        task.selection_expires_at = None;
        let responses: Vec<PeerResponse> = task
            .search_results
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        let response = responses.into_iter().find(|r| r.username == username);
        let chosen = ScoredCandidate {
            username: username.clone(),
            score: 0.0,
            quality_tier: response.as_ref().map(scoring::dominant_quality).unwrap_or(crate::persistence::QualityTier::Unknown),
            quality_format: None,
            quality_bit_rate: None,
            quality_bit_depth: None,
            quality_sample_rate: None,
            has_slot: false,
            upload_speed: 0,
            file_count: 0,
            completeness_ratio: 0.0,
        };
        self.apply_selection(task, Trigger::Select, chosen, response, directory).await
    }

    /// External collaborator entry point: a human rejected a peer, so it's
    /// excluded from future ranking and the remaining candidates are
    /// re-evaluated.
    pub async fn skip(&self, task_id: &str, username: String) -> AppResult<()> {
        let Some(mut task) = self.store.get_download_task(task_id)? else { return Ok(()) };
        task.skipped_usernames.push(username);
        let responses: Vec<PeerResponse> = task
            .search_results
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        self.score_and_branch(task, responses).await
    }

    /// External collaborator entry point: re-run the search, optionally
    /// with a different query.
    pub async fn retry_search(&self, task_id: &str, query: Option<String>) -> AppResult<()> {
        let Some(mut task) = self.store.get_download_task(task_id)? else { return Ok(()) };
        let Some(next) = fsm::apply(task.status, Trigger::RetrySearch) else { return Ok(()) };
        task.status = next;
        task.selection_expires_at = None;
        task.search_query = query.or(task.search_query.map(|q| {
            if self.config.simplify_on_retry {
                search_query::simplify(&q)
            } else {
                q
            }
        }));
        self.persist_and_emit(task).await
    }

    /// External collaborator entry point: re-rank the stored candidates
    /// and pick the winner, without waiting for a human.
    pub async fn auto_select(&self, task_id: &str) -> AppResult<()> {
        let Some(task) = self.store.get_download_task(task_id)? else { return Ok(()) };
        let responses: Vec<PeerResponse> = task
            .search_results
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        self.score_and_branch(task, responses).await
    }

    async fn check_selection_expiry(&self, mut task: DownloadTask) -> AppResult<()> {
        let Some(expires) = task.selection_expires_at else { return Ok(()) };
        if chrono::Utc::now().timestamp() < expires {
            return Ok(());
        }
        let Some(next) = fsm::apply(task.status, Trigger::SelectionExpired) else { return Ok(()) };
        task.status = next;
        task.error_message = Some("Selection expired".to_string());
        task.completed_at = Some(chrono::Utc::now().timestamp());
        self.persist_and_emit(task.clone()).await?;
        self.events.emit_download(DownloadEvent::SelectionExpired { id: task.id });
        Ok(())
    }

    /// `deferred` tasks store their retry-at timestamp in
    /// `selection_expires_at` — unused in this state, so the column is
    /// reused rather than adding a near-duplicate one.
    async fn check_backoff(&self, mut task: DownloadTask) -> AppResult<()> {
        let Some(retry_at) = task.selection_expires_at else {
            let Some(next) = fsm::apply(task.status, Trigger::RetryBackoffElapsed) else { return Ok(()) };
            task.status = next;
            return self.persist_and_emit(task).await;
        };
        if chrono::Utc::now().timestamp() < retry_at {
            return Ok(());
        }
        let Some(next) = fsm::apply(task.status, Trigger::RetryBackoffElapsed) else { return Ok(()) };
        task.status = next;
        task.selection_expires_at = None;
        self.persist_and_emit(task).await
    }

    async fn check_peer_ack(&self, mut task: DownloadTask) -> AppResult<()> {
        let Some(username) = task.peer_username.clone() else { return Ok(()) };
        let transfers = match self.peers.transfers().await {
            Ok(t) => t,
            Err(err) => return self.fail(task, format!("transfer status check failed: {err}")).await,
        };
        let directory = task.peer_directory.clone().unwrap_or_default();
        let acked = transfers.iter().any(|t| t.username == username && progress::matches_task(t, &username, &directory));
        if !acked {
            return Ok(());
        }
        let Some(next) = fsm::apply(task.status, Trigger::PeerAcked) else { return Ok(()) };
        task.status = next;
        task.started_at = Some(chrono::Utc::now().timestamp());
        self.persist_and_emit(task).await
    }

    async fn reconcile_transfer(&self, mut task: DownloadTask) -> AppResult<()> {
        let (Some(username), Some(directory)) = (task.peer_username.clone(), task.peer_directory.clone()) else {
            return Ok(());
        };
        let transfers = match self.peers.transfers().await {
            Ok(t) => t,
            Err(err) => return self.fail(task, format!("transfer poll failed: {err}")).await,
        };
        let Some(transfer) = transfers.iter().find(|t| progress::matches_task(t, &username, &directory)) else {
            return Ok(());
        };

        match progress::aggregate(transfer) {
            progress::ProgressOutcome::InProgress(snapshot) => {
                self.events.emit_download(DownloadEvent::Progress {
                    id: task.id.clone(),
                    files_completed: snapshot.files_completed,
                    files_total: snapshot.files_total,
                    bytes_transferred: snapshot.bytes_transferred,
                    bytes_total: snapshot.bytes_total,
                });
                Ok(())
            }
            progress::ProgressOutcome::Completed(snapshot) => {
                let Some(next) = fsm::apply(task.status, Trigger::TransferCompleted) else { return Ok(()) };
                let resolved = self.resolve_path(task.download_path.as_deref(), &username, &directory);
                task.status = next;
                task.completed_at = Some(chrono::Utc::now().timestamp());
                task.file_count = Some(snapshot.files_total);
                task.download_path = resolved.map(|p| p.to_string_lossy().to_string());
                self.persist_and_emit(task).await
            }
            progress::ProgressOutcome::Failed { message, .. } => self.fail(task, message).await,
        }
    }

    fn resolve_path(&self, download_path: Option<&str>, username: &str, directory: &str) -> Option<std::path::PathBuf> {
        path_resolution::resolve(&self.config.downloads_root, download_path, username, directory, |p: &Path| p.exists())
    }

    /// A step failed (peer search / transfer). Retryable per `RetryPolicy`
    /// goes to `deferred` and loops back via `check_backoff`; exhausted
    /// retries land on the terminal `failed` state.
    async fn fail(&self, mut task: DownloadTask, message: String) -> AppResult<()> {
        debug!(task_id = %task.id, %message, "download task step failed");
        task.error_message = Some(message);
        let retryable = self.config.retry_policy.should_retry(task.retry_count as i32);
        let trigger = if retryable { Trigger::StepFailedRetryable } else { Trigger::StepFailedExhausted };
        let Some(next) = fsm::apply(task.status, trigger) else { return Ok(()) };
        task.status = next;
        if next.is_terminal() {
            task.completed_at = Some(chrono::Utc::now().timestamp());
        } else {
            task.selection_expires_at = Some(self.config.retry_policy.next_retry_at(task.retry_count as i32));
            task.retry_count += 1;
        }
        self.persist_and_emit(task).await
    }

    async fn persist_and_emit(&self, task: DownloadTask) -> AppResult<()> {
        let id = task.id.clone();
        let status = task.status.to_string();
        self.store.update_download_task(task).await?;
        self.events.emit_download(DownloadEvent::TaskUpdated { id, status });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{ContentType, WishlistItem};

    fn engine() -> DownloadEngine {
        let store = Arc::new(Store::in_memory().unwrap());
        let events = Arc::new(EventBus::new());
        let peers = PeerSearchClient::new("http://127.0.0.1:0".to_string(), "test-key".to_string());
        let config = EngineConfig {
            selection_mode: SelectionMode::Auto,
            selection_timeout_hours: 24,
            search_timeout_ms: 15_000,
            min_responses: 1,
            simplify_on_retry: true,
            exclude_terms: Vec::new(),
            scoring: ScoringConfig::default(),
            file_filter: file_filter::FileFilterConfig { min_file_size_mb: 0.0, max_file_size_mb: 1000.0, directory: None },
            retry_policy: RetryPolicy::default(),
            downloads_root: std::path::PathBuf::from("/downloads"),
        };
        DownloadEngine::new(store, events, peers, config)
    }

    async fn seed_wishlist_item(engine: &DownloadEngine) -> WishlistItem {
        let item = WishlistItem {
            id: uuid::Uuid::new_v4().to_string(),
            artist: "Artist".into(),
            album: "Album".into(),
            item_type: ContentType::Album,
            year: None,
            canonical_id: None,
            source: None,
            cover_url: None,
            added_at: chrono::Utc::now().timestamp(),
            processed_at: None,
        };
        engine.store.insert_wishlist_item(item.clone()).await.unwrap();
        item
    }

    #[tokio::test]
    async fn pick_up_creates_a_pending_task() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();

        let tasks = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].wishlist_item_id, item.id);
    }

    #[tokio::test]
    async fn start_search_builds_a_query_and_advances_to_searching() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);

        engine.start_search(task).await.unwrap();

        let searching = engine.store.list_download_tasks_by_status(DownloadStatus::Searching).unwrap();
        assert_eq!(searching.len(), 1);
        assert_eq!(searching[0].search_query.as_deref(), Some("Artist - Album"));
    }

    #[tokio::test]
    async fn fail_defers_a_retryable_task_with_a_future_retry_at() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::Searching;
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.fail(task, "no candidates".to_string()).await.unwrap();

        let deferred = engine.store.list_download_tasks_by_status(DownloadStatus::Deferred).unwrap();
        assert_eq!(deferred.len(), 1);
        assert_eq!(deferred[0].retry_count, 1);
        assert!(deferred[0].selection_expires_at.unwrap() > chrono::Utc::now().timestamp());
    }

    #[tokio::test]
    async fn fail_is_terminal_once_retries_are_exhausted() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::Searching;
        task.retry_count = engine.config.retry_policy.max_retries as i64;
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.fail(task, "no candidates".to_string()).await.unwrap();

        let failed = engine.store.list_download_tasks_by_status(DownloadStatus::Failed).unwrap();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].completed_at.is_some());
    }

    fn peer_response(username: &str) -> PeerResponse {
        use crate::clients::peer_search::PeerFile;
        PeerResponse {
            username: username.into(),
            files: vec![PeerFile {
                filename: "Album/01.flac".into(),
                size: 20_000_000,
                bit_rate: None,
                bit_depth: Some(16),
                sample_rate: Some(44_100),
            }],
            has_slot: Some(true),
            upload_speed: Some(100_000),
        }
    }

    /// The test fixture `engine()` points `peers` at an unreachable
    /// endpoint, so `enqueue` fails and the task must not be silently
    /// promoted to `queued` — it defers instead.
    #[tokio::test]
    async fn score_and_branch_defers_when_enqueue_fails() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::Searching;
        task.expected_track_count = Some(1);
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.score_and_branch(task, vec![peer_response("alice")]).await.unwrap();

        let deferred = engine.store.list_download_tasks_by_status(DownloadStatus::Deferred).unwrap();
        assert_eq!(deferred.len(), 1);
        assert!(deferred[0].peer_username.is_none());
        assert!(deferred[0].error_message.as_deref().unwrap_or("").contains("enqueue failed"));
    }

    /// Manual selection re-derives the stored `search_results` JSON,
    /// round-tripping through `PeerResponse`'s (de)serialization. Here
    /// the peer endpoint is unreachable so `enqueue` fails; the task
    /// defers from `pending_selection` rather than being silently
    /// promoted to `queued`.
    #[tokio::test]
    async fn select_round_trips_stored_search_results() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::PendingSelection;
        task.search_results = Some(serde_json::to_value(vec![peer_response("alice")]).unwrap());
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.select(&task.id, "alice".to_string(), Some("Album".to_string())).await.unwrap();

        let deferred = engine.store.list_download_tasks_by_status(DownloadStatus::Deferred).unwrap();
        assert_eq!(deferred.len(), 1);
        assert!(deferred[0].peer_username.is_none());
    }

    /// `skip` must persist even though the replacement candidate is also
    /// unreachable: `skipped_usernames` has to survive the round trip, and
    /// the enqueue failure on the new pick still defers the task rather
    /// than silently dropping the skip.
    #[tokio::test]
    async fn skip_persists_the_skipped_username_and_reevaluates() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::PendingSelection;
        task.expected_track_count = Some(1);
        task.search_results =
            Some(serde_json::to_value(vec![peer_response("alice"), peer_response("bob")]).unwrap());
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.skip(&task.id, "alice".to_string()).await.unwrap();

        let deferred = engine.store.list_download_tasks_by_status(DownloadStatus::Deferred).unwrap();
        assert_eq!(deferred.len(), 1);
        assert!(deferred[0].skipped_usernames.contains(&"alice".to_string()));
    }

    /// `auto_select` re-ranks the stored candidates from `pending_selection`
    /// without a human in the loop; the unreachable fixture endpoint still
    /// defers the task rather than leaving it stuck.
    #[tokio::test]
    async fn auto_select_reevaluates_from_pending_selection() {
        let engine = engine();
        let item = seed_wishlist_item(&engine).await;
        engine.pick_up(item.id.clone(), item.wishlist_key()).await.unwrap();
        let mut task = engine.store.list_download_tasks_by_status(DownloadStatus::Pending).unwrap().remove(0);
        task.status = DownloadStatus::PendingSelection;
        task.expected_track_count = Some(1);
        task.search_results = Some(serde_json::to_value(vec![peer_response("alice")]).unwrap());
        engine.store.update_download_task(task.clone()).await.unwrap();

        engine.auto_select(&task.id).await.unwrap();

        let deferred = engine.store.list_download_tasks_by_status(DownloadStatus::Deferred).unwrap();
        assert_eq!(deferred.len(), 1);
    }
}
