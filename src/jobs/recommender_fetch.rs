//! Pulls fresh recommendations from the configured feed and turns the
//! ones worth pursuing into queue items.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule};
use crate::config::ContentMode;
use crate::persistence::ContentType;
use crate::queue::QueueService;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RecommenderFetchConfig {
    pub listenbrainz_user: String,
    pub listenbrainz_token: String,
    pub fetch_count: usize,
    pub min_score: f64,
    /// Whether a fresh recommendation is approved straight to the
    /// wishlist rather than left pending in the queue for curation.
    pub auto_approve: bool,
    /// Album mode resolves a recommended recording to its containing
    /// album before queueing; track mode queues the recording itself.
    pub mode: ContentMode,
    pub interval: Duration,
}

pub struct RecommenderFetchJob {
    config: RecommenderFetchConfig,
}

impl RecommenderFetchJob {
    pub fn new(config: RecommenderFetchConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackgroundJob for RecommenderFetchJob {
    fn id(&self) -> &'static str {
        "recommender-fetch"
    }

    fn name(&self) -> &'static str {
        "Recommender Fetch"
    }

    fn description(&self) -> &'static str {
        "Pulls fresh recommendations and queues the ones worth pursuing"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.config.interval)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let recommendations = ctx
            .clients
            .recommender
            .fetch_recommendations(
                &self.config.listenbrainz_user,
                &self.config.listenbrainz_token,
                self.config.fetch_count,
            )
            .await;
        debug!("recommender-fetch pulled {} recommendations", recommendations.len());

        let queue = QueueService::new(Arc::clone(&ctx.store), Arc::clone(&ctx.events));

        for rec in recommendations {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }

            if rec.score.map(|s| s < self.config.min_score).unwrap_or(false) {
                continue;
            }

            let already_seen = ctx
                .store
                .is_processed(&rec.canonical_id)
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                || ctx
                    .store
                    .find_queue_item_by_canonical_id(&rec.canonical_id)
                    .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                    .is_some();
            if already_seen {
                continue;
            }

            let item = match self.config.mode {
                ContentMode::Album => {
                    ctx.clients.similarity_pacer.wait().await;
                    let Some(album) = ctx.clients.metadata.resolve_recording_to_album(&rec.canonical_id).await else {
                        debug!("recommender-fetch: could not resolve {} to an album, skipping", rec.canonical_id);
                        continue;
                    };
                    let cover_url = ctx.clients.coverart.cover_url(&album.album_id, 500);
                    queue
                        .add_pending(
                            rec.canonical_id.clone(),
                            album.artist,
                            Some(album.album_title),
                            Some(album.track_title),
                            ContentType::Album,
                            rec.score,
                            crate::persistence::QueueSource::Recommender,
                            vec![],
                            None,
                            Some(cover_url),
                            album.year,
                        )
                        .await
                        .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                }
                ContentMode::Track => {
                    ctx.clients.similarity_pacer.wait().await;
                    let Some(recording) = ctx.clients.metadata.resolve_recording(&rec.canonical_id).await else {
                        debug!("recommender-fetch: could not resolve {}, skipping", rec.canonical_id);
                        continue;
                    };
                    queue
                        .add_pending(
                            rec.canonical_id.clone(),
                            recording.artist,
                            None,
                            Some(recording.title),
                            ContentType::Track,
                            rec.score,
                            crate::persistence::QueueSource::Recommender,
                            vec![],
                            None,
                            None,
                            None,
                        )
                        .await
                        .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                }
            };

            if self.config.auto_approve {
                queue
                    .approve(vec![item.id])
                    .await
                    .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
            }

            ctx.store
                .mark_processed(rec.canonical_id)
                .await
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        }

        Ok(())
    }
}
