use super::context::JobContext;
use super::cron;
use super::handle::{SchedulerCommand, SharedJobState};
use super::job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior};
use crate::persistence::{JobRunStatus, Store};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Manages background job scheduling and execution.
pub struct JobScheduler {
    /// Shared state accessible by SchedulerHandle
    shared_state: Arc<RwLock<SharedJobState>>,

    /// Currently running jobs with their task handles (not shared, managed by scheduler loop)
    running_handles: HashMap<String, JoinHandle<()>>,

    /// Cancellation tokens for each running job.
    job_cancel_tokens: HashMap<String, CancellationToken>,

    /// Parsed cron schedules, keyed by job ID. Parsed once at
    /// registration; a job whose expression fails to parse is absent
    /// here and its cron arm of the schedule is simply never due.
    cron_schedules: HashMap<String, cron::Schedule>,

    /// Store for persisting job history.
    store: Arc<Store>,

    /// Receiver for hook events.
    hook_receiver: mpsc::Receiver<HookEvent>,

    /// Receiver for commands from SchedulerHandle
    command_receiver: mpsc::Receiver<SchedulerCommand>,

    /// Token to signal scheduler shutdown.
    shutdown_token: CancellationToken,

    /// Shared context provided to jobs during execution.
    job_context: JobContext,
}

impl JobScheduler {
    /// Create a new job scheduler and return a handle for interacting with it.
    pub fn new(
        store: Arc<Store>,
        hook_receiver: mpsc::Receiver<HookEvent>,
        command_receiver: mpsc::Receiver<SchedulerCommand>,
        shutdown_token: CancellationToken,
        job_context: JobContext,
        shared_state: Arc<RwLock<SharedJobState>>,
    ) -> Self {
        Self {
            shared_state,
            running_handles: HashMap::new(),
            job_cancel_tokens: HashMap::new(),
            cron_schedules: HashMap::new(),
            store,
            hook_receiver,
            command_receiver,
            shutdown_token,
            job_context,
        }
    }

    /// Register a job with the scheduler.
    pub async fn register_job(&mut self, job: Arc<dyn BackgroundJob>) {
        let job_id = job.id().to_string();
        info!("Registering job: {} - {}", job_id, job.description());

        let cron_expr = match job.schedule() {
            JobSchedule::Cron(expr) => Some(expr),
            JobSchedule::Combined { cron: Some(expr), .. } => Some(expr),
            _ => None,
        };
        if let Some(expr) = cron_expr {
            match cron::parse(&expr) {
                Some(schedule) => {
                    self.cron_schedules.insert(job_id.clone(), schedule);
                }
                None => {
                    warn!(
                        "Job {} has an invalid cron expression '{}'; it will only run via its other triggers",
                        job_id, expr
                    );
                }
            }
        }

        let mut state = self.shared_state.write().await;
        state.jobs.insert(job_id, job);
    }

    /// Get the number of registered jobs.
    pub async fn job_count(&self) -> usize {
        self.shared_state.read().await.jobs.len()
    }

    /// Main scheduler loop.
    pub async fn run(&mut self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        match self.store.mark_stale_jobs_failed().await {
            Ok(count) if count > 0 => {
                info!("Marked {} stale jobs as failed from previous run", count);
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to mark stale jobs: {}", e);
            }
        }

        self.trigger_jobs_for_hook(HookEvent::OnStartup).await;

        loop {
            self.cleanup_completed_jobs().await;

            let sleep_duration = self.time_until_next_scheduled_job().await;
            debug!(
                "Scheduler sleeping for {:?} until next scheduled job",
                sleep_duration
            );

            tokio::select! {
                _ = tokio::time::sleep(sleep_duration) => {
                    self.run_due_jobs().await;
                }
                Some(event) = self.hook_receiver.recv() => {
                    debug!("Received hook event: {}", event);
                    self.trigger_jobs_for_hook(event).await;
                }
                Some(cmd) = self.command_receiver.recv() => {
                    self.handle_command(cmd).await;
                }
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    self.shutdown().await;
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    /// Handle a command from the SchedulerHandle.
    async fn handle_command(&mut self, cmd: SchedulerCommand) {
        match cmd {
            SchedulerCommand::TriggerJob { job_id, response } => {
                let result = self.trigger_job(&job_id).await;
                let _ = response.send(result);
            }
        }
    }

    /// Manually trigger a job by ID.
    async fn trigger_job(&mut self, job_id: &str) -> Result<(), JobError> {
        let state = self.shared_state.read().await;
        if !state.jobs.contains_key(job_id) {
            return Err(JobError::NotFound);
        }

        if state.running_jobs.contains(job_id) {
            return Err(JobError::AlreadyRunning);
        }
        drop(state);

        self.spawn_job(job_id, "manual").await;
        Ok(())
    }

    /// Calculate time until the next scheduled job should run.
    async fn time_until_next_scheduled_job(&self) -> Duration {
        let mut min_duration = Duration::from_secs(60);

        let state = self.shared_state.read().await;
        for (job_id, job) in &state.jobs {
            if state.running_jobs.contains(job_id) {
                continue;
            }

            if let Some(next_run) = self.get_next_run_time(job_id, job.schedule()) {
                let now = chrono::Utc::now();
                if next_run > now {
                    let duration = (next_run - now).to_std().unwrap_or(Duration::from_secs(1));
                    if duration < min_duration {
                        min_duration = duration;
                    }
                } else {
                    return Duration::from_secs(0);
                }
            }
        }

        min_duration
    }

    /// Get the next scheduled run time for a job.
    fn get_next_run_time(
        &self,
        job_id: &str,
        schedule: JobSchedule,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        let interval_next = |interval: Option<Duration>| -> Option<chrono::DateTime<chrono::Utc>> {
            interval.map(|_| {
                if let Ok(Some(state)) = self.store.get_schedule_state(job_id) {
                    state.next_run_at
                } else {
                    chrono::Utc::now()
                }
            })
        };
        let cron_next = || -> Option<chrono::DateTime<chrono::Utc>> {
            let parsed = self.cron_schedules.get(job_id)?;
            let last_run = self
                .store
                .get_schedule_state(job_id)
                .ok()
                .flatten()
                .and_then(|s| s.last_run_at)
                .unwrap_or_else(chrono::Utc::now);
            cron::next_after(parsed, last_run)
        };

        match schedule {
            JobSchedule::Interval(interval) => interval_next(Some(interval)),
            JobSchedule::Cron(_) => cron_next(),
            JobSchedule::Hook(_) => None,
            JobSchedule::Combined { cron, interval, .. } => {
                let a = interval_next(interval);
                let b = cron.is_some().then(cron_next).flatten();
                match (a, b) {
                    (Some(a), Some(b)) => Some(a.min(b)),
                    (Some(a), None) => Some(a),
                    (None, Some(b)) => Some(b),
                    (None, None) => None,
                }
            }
        }
    }

    /// Run all jobs that are due for scheduled execution.
    async fn run_due_jobs(&mut self) {
        let now = chrono::Utc::now();
        let mut jobs_to_run = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    continue;
                }

                if let Some(next_run) = self.get_next_run_time(job_id, job.schedule()) {
                    if next_run <= now {
                        jobs_to_run.push(job_id.clone());
                    }
                }
            }
        }

        for job_id in jobs_to_run {
            self.spawn_job(&job_id, "schedule").await;
        }
    }

    /// Trigger all jobs that listen for a specific hook event.
    async fn trigger_jobs_for_hook(&mut self, event: HookEvent) {
        let mut jobs_to_trigger = Vec::new();

        {
            let state = self.shared_state.read().await;
            for (job_id, job) in &state.jobs {
                if state.running_jobs.contains(job_id) {
                    debug!("Skipping hook trigger for already running job: {}", job_id);
                    continue;
                }

                let should_trigger = match job.schedule() {
                    JobSchedule::Hook(hook_event) => hook_event == event,
                    JobSchedule::Combined { ref hooks, .. } => hooks.contains(&event),
                    _ => false,
                };

                if should_trigger {
                    jobs_to_trigger.push(job_id.clone());
                }
            }
        }

        for job_id in jobs_to_trigger {
            let trigger = format!("hook:{}", event);
            self.spawn_job(&job_id, &trigger).await;
        }
    }

    /// Spawn a job execution task.
    async fn spawn_job(&mut self, job_id: &str, triggered_by: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => {
                    error!("Attempted to spawn unknown job: {}", job_id);
                    return;
                }
            }
        };

        let run_id = match self
            .store
            .record_job_start(job_id.to_string(), triggered_by.to_string())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to record job start for {}: {}", job_id, e);
                return;
            }
        };

        info!(
            "Starting job: {} (run_id: {}, triggered_by: {})",
            job_id, run_id, triggered_by
        );

        {
            let mut state = self.shared_state.write().await;
            state.running_jobs.insert(job_id.to_string());
        }

        // Initialize schedule state for interval-based jobs to prevent tight loops
        // before the job completes. This sets next_run_at to now + interval.
        let interval = match job.schedule() {
            JobSchedule::Interval(int) => Some(int),
            JobSchedule::Combined { interval, .. } => interval,
            _ => None,
        };
        if let Some(interval) = interval {
            let next_run =
                chrono::Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
            if let Err(e) = self
                .store
                .update_schedule_state(job_id.to_string(), next_run, None)
                .await
            {
                warn!("Failed to initialize schedule state for {}: {}", job_id, e);
            }
        }

        let cancel_token = self.job_context.cancellation_token.child_token();
        self.job_cancel_tokens
            .insert(job_id.to_string(), cancel_token.clone());

        let ctx = JobContext::new(
            cancel_token,
            Arc::clone(&self.job_context.store),
            Arc::clone(&self.job_context.clients),
            Arc::clone(&self.job_context.events),
            Arc::clone(&self.job_context.downloads),
        );

        let store = Arc::clone(&self.store);
        let events = Arc::clone(&self.job_context.events);
        let job_id_owned = job_id.to_string();
        let shared_state = Arc::clone(&self.shared_state);

        events.emit_job(crate::events::JobEvent::Started { job_id: job_id_owned.clone(), run_id });

        let handle = tokio::spawn(async move {
            let start_time = Instant::now();
            let result = job.execute(&ctx).await;
            let elapsed = start_time.elapsed();
            let duration_ms = elapsed.as_millis() as i64;

            let (status, error_msg) = match result {
                Ok(()) => {
                    info!(
                        "Job {} completed successfully in {:?}",
                        job_id_owned, elapsed
                    );
                    events.emit_job(crate::events::JobEvent::Completed { job_id: job_id_owned.clone(), duration_ms });
                    (JobRunStatus::Completed, None)
                }
                Err(JobError::Cancelled) => {
                    info!("Job {} was cancelled after {:?}", job_id_owned, elapsed);
                    events.emit_job(crate::events::JobEvent::Cancelled { job_id: job_id_owned.clone(), duration_ms });
                    (JobRunStatus::Cancelled, Some("Cancelled".to_string()))
                }
                Err(e) => {
                    error!("Job {} failed after {:?}: {}", job_id_owned, elapsed, e);
                    events.emit_job(crate::events::JobEvent::Failed {
                        job_id: job_id_owned.clone(),
                        error: e.to_string(),
                        duration_ms,
                    });
                    (JobRunStatus::Failed, Some(e.to_string()))
                }
            };

            if let Err(e) = store.record_job_finish(run_id, status, error_msg).await {
                error!("Failed to record job finish for {}: {}", job_id_owned, e);
            }

            {
                let mut state = shared_state.write().await;
                state.running_jobs.remove(&job_id_owned);
            }
        });

        self.running_handles.insert(job_id.to_string(), handle);
    }

    /// Update schedule state after a job completes (for interval-based jobs).
    async fn update_schedule_after_run(&self, job_id: &str) {
        let job = {
            let state = self.shared_state.read().await;
            match state.jobs.get(job_id) {
                Some(job) => Arc::clone(job),
                None => return,
            }
        };

        let interval = match job.schedule() {
            JobSchedule::Interval(int) => Some(int),
            JobSchedule::Combined { interval, .. } => interval,
            _ => None,
        };

        if let Some(interval) = interval {
            let next_run =
                chrono::Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default();
            if let Err(e) = self
                .store
                .update_schedule_state(job_id.to_string(), next_run, Some(chrono::Utc::now()))
                .await
            {
                error!("Failed to update schedule state for {}: {}", job_id, e);
            }
        } else if self.cron_schedules.contains_key(job_id) {
            // Cron-only jobs still need last_run_at recorded so the next
            // `after(&last_run)` lookup advances past this run.
            if let Ok(Some(mut state)) = self.store.get_schedule_state(job_id) {
                state.last_run_at = Some(chrono::Utc::now());
                if let Err(e) = self
                    .store
                    .update_schedule_state(job_id.to_string(), state.next_run_at, state.last_run_at)
                    .await
                {
                    error!("Failed to update schedule state for {}: {}", job_id, e);
                }
            } else if let Err(e) = self
                .store
                .update_schedule_state(job_id.to_string(), chrono::Utc::now(), Some(chrono::Utc::now()))
                .await
            {
                error!("Failed to update schedule state for {}: {}", job_id, e);
            }
        }
    }

    /// Clean up handles for completed jobs.
    async fn cleanup_completed_jobs(&mut self) {
        let mut completed = Vec::new();

        for (job_id, handle) in &self.running_handles {
            if handle.is_finished() {
                completed.push(job_id.clone());
            }
        }

        for job_id in completed {
            if let Some(handle) = self.running_handles.remove(&job_id) {
                let _ = handle.await;
            }
            self.job_cancel_tokens.remove(&job_id);
            self.update_schedule_after_run(&job_id).await;
        }
    }

    /// Gracefully shut down the scheduler.
    async fn shutdown(&mut self) {
        info!("Shutting down scheduler...");

        {
            let state = self.shared_state.read().await;
            for job_id in &state.running_jobs {
                if let Some(job) = state.jobs.get(job_id) {
                    if job.shutdown_behavior() == ShutdownBehavior::Cancellable {
                        if let Some(token) = self.job_cancel_tokens.get(job_id) {
                            debug!("Cancelling job: {}", job_id);
                            token.cancel();
                        }
                    }
                }
            }
        }

        let mut wait_jobs = Vec::new();
        for (job_id, handle) in self.running_handles.drain() {
            let behavior = {
                let state = self.shared_state.read().await;
                state
                    .jobs
                    .get(&job_id)
                    .map(|j| j.shutdown_behavior())
                    .unwrap_or(ShutdownBehavior::Cancellable)
            };
            wait_jobs.push((job_id, handle, behavior));
        }

        for (job_id, handle, behavior) in wait_jobs {
            if behavior == ShutdownBehavior::WaitForCompletion {
                info!("Waiting for job {} to complete...", job_id);
            }
            let _ = tokio::time::timeout(Duration::from_secs(30), handle).await;
        }

        self.job_cancel_tokens.clear();
        info!("Scheduler shutdown complete");
    }
}

/// Create a scheduler and its handle.
pub fn create_scheduler(
    store: Arc<Store>,
    hook_receiver: mpsc::Receiver<HookEvent>,
    shutdown_token: CancellationToken,
    job_context: JobContext,
) -> (JobScheduler, super::handle::SchedulerHandle) {
    let (command_tx, command_rx) = mpsc::channel(100);
    let shared_state = Arc::new(RwLock::new(SharedJobState {
        jobs: HashMap::new(),
        running_jobs: HashSet::new(),
    }));

    let scheduler = JobScheduler::new(
        store.clone(),
        hook_receiver,
        command_rx,
        shutdown_token,
        job_context,
        Arc::clone(&shared_state),
    );

    let handle = super::handle::SchedulerHandle::new(command_tx, shared_state, store);

    (scheduler, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background_jobs::clients_bundle::Clients;
    use crate::clients::{
        CoverArtClient, LibraryClient, MetadataClient, PeerSearchClient, RecommenderClient,
        RequestPacer, SimilarityClient,
    };
    use crate::download::{DownloadEngine, EngineConfig, SelectionMode};
    use crate::download::file_filter::FileFilterConfig;
    use crate::download::retry_policy::RetryPolicy;
    use crate::download::scoring::ScoringConfig;
    use crate::events::EventBus;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct TestJob {
        id: &'static str,
        execution_count: Arc<AtomicUsize>,
        should_fail: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BackgroundJob for TestJob {
        fn id(&self) -> &'static str {
            self.id
        }

        fn name(&self) -> &'static str {
            "Test Job"
        }

        fn description(&self) -> &'static str {
            "A test job for unit tests"
        }

        fn schedule(&self) -> JobSchedule {
            JobSchedule::Hook(HookEvent::OnStartup)
        }

        async fn execute(&self, _ctx: &JobContext) -> Result<(), JobError> {
            self.execution_count.fetch_add(1, Ordering::SeqCst);
            if self.should_fail.load(Ordering::SeqCst) {
                Err(JobError::ExecutionFailed("Test failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    async fn test_context(store: Arc<Store>) -> JobContext {
        let events = Arc::new(EventBus::new());
        let clients = Arc::new(Clients {
            recommender: RecommenderClient::new("http://127.0.0.1:0".to_string()),
            library: LibraryClient::new("http://127.0.0.1:0".to_string(), "salt".to_string()),
            similarity: SimilarityClient::new("http://127.0.0.1:0".to_string(), "key".to_string()),
            metadata: MetadataClient::new("http://127.0.0.1:0".to_string(), "test-agent".to_string())
                .expect("metadata client"),
            coverart: CoverArtClient::new("http://127.0.0.1:0".to_string()),
            peer_search: PeerSearchClient::new("http://127.0.0.1:0".to_string(), "test-key".to_string()),
            similarity_pacer: RequestPacer::new(Duration::from_secs(1)),
        });
        let downloads = Arc::new(DownloadEngine::new(
            Arc::clone(&store),
            Arc::clone(&events),
            PeerSearchClient::new("http://127.0.0.1:0".to_string(), "test-key".to_string()),
            EngineConfig {
                selection_mode: SelectionMode::Auto,
                selection_timeout_hours: 24,
                search_timeout_ms: 5000,
                min_responses: 1,
                simplify_on_retry: true,
                exclude_terms: vec![],
                scoring: ScoringConfig::default(),
                file_filter: FileFilterConfig {
                    min_file_size_mb: 0.0,
                    max_file_size_mb: 10_000.0,
                    directory: None,
                },
                retry_policy: RetryPolicy::default(),
                downloads_root: PathBuf::from("/tmp/discology-test"),
            },
        ));
        JobContext::new(
            CancellationToken::new(),
            store,
            clients,
            events,
            downloads,
        )
    }

    async fn create_test_scheduler() -> (JobScheduler, super::super::handle::SchedulerHandle, mpsc::Sender<HookEvent>) {
        let store = Arc::new(Store::in_memory().expect("in-memory store"));
        let (hook_sender, hook_receiver) = mpsc::channel(100);
        let shutdown_token = CancellationToken::new();
        let job_context = test_context(Arc::clone(&store)).await;

        let (scheduler, handle) = create_scheduler(store, hook_receiver, shutdown_token, job_context);
        (scheduler, handle, hook_sender)
    }

    #[tokio::test]
    async fn registers_and_counts_jobs() {
        let (mut scheduler, _handle, _hook_sender) = create_test_scheduler().await;
        let job = Arc::new(TestJob {
            id: "test-job",
            execution_count: Arc::new(AtomicUsize::new(0)),
            should_fail: Arc::new(AtomicBool::new(false)),
        });
        scheduler.register_job(job).await;
        assert_eq!(scheduler.job_count().await, 1);
    }

    #[tokio::test]
    async fn manual_trigger_runs_a_registered_job() {
        let (mut scheduler, handle, _hook_sender) = create_test_scheduler().await;
        let execution_count = Arc::new(AtomicUsize::new(0));
        let job = Arc::new(TestJob {
            id: "manual-job",
            execution_count: Arc::clone(&execution_count),
            should_fail: Arc::new(AtomicBool::new(false)),
        });
        scheduler.register_job(job).await;

        tokio::spawn(async move {
            scheduler.run().await;
        });

        handle.trigger_job("manual-job").await.expect("trigger");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(execution_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_cron_expression_demotes_job_to_manual_only() {
        let (mut scheduler, _handle, _hook_sender) = create_test_scheduler().await;
        struct CronJob;
        #[async_trait]
        impl BackgroundJob for CronJob {
            fn id(&self) -> &'static str {
                "bad-cron"
            }
            fn name(&self) -> &'static str {
                "Bad Cron"
            }
            fn description(&self) -> &'static str {
                "job with an invalid cron expression"
            }
            fn schedule(&self) -> JobSchedule {
                JobSchedule::Cron("not a cron expression".to_string())
            }
            async fn execute(&self, _ctx: &JobContext) -> Result<(), JobError> {
                Ok(())
            }
        }
        scheduler.register_job(Arc::new(CronJob)).await;
        assert!(scheduler.cron_schedules.is_empty());
        assert!(scheduler
            .get_next_run_time("bad-cron", JobSchedule::Cron("not a cron expression".to_string()))
            .is_none());
    }
}
