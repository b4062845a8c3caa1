//! Mirrors the library's artists, asks the similarity source what's
//! near them, and turns the strongest, not-yet-owned candidates into
//! queue items.

use crate::background_jobs::{BackgroundJob, JobContext, JobError, JobSchedule};
use crate::persistence::{CatalogArtist, ContentType, QueueSource};
use crate::queue::QueueService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CatalogSimilarityConfig {
    pub similar_per_artist: usize,
    pub albums_per_artist: usize,
    pub max_artists_per_run: usize,
    /// Minimum `match` score a similar-artist hit must carry before it
    /// is even aggregated into a candidate.
    pub min_similarity: f64,
    pub interval: Duration,
}

struct Candidate {
    name: String,
    canonical_id: Option<String>,
    score: f64,
    source_count: u32,
}

pub struct CatalogSimilarityJob {
    config: CatalogSimilarityConfig,
}

impl CatalogSimilarityJob {
    pub fn new(config: CatalogSimilarityConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl BackgroundJob for CatalogSimilarityJob {
    fn id(&self) -> &'static str {
        "catalog-similarity"
    }

    fn name(&self) -> &'static str {
        "Catalog Similarity"
    }

    fn description(&self) -> &'static str {
        "Finds artists similar to the library and queues their best albums"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(self.config.interval)
    }

    async fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let library = ctx.clients.library.list_artists().await;
        for artist in library.values() {
            ctx.store
                .upsert_catalog_artist(CatalogArtist {
                    name: artist.name.clone(),
                    name_lower: artist.name.to_lowercase(),
                    external_id: artist.external_id.clone(),
                    last_synced_at: 0,
                })
                .await
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        }
        debug!("catalog-similarity synced {} library artists", library.len());

        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        for artist in library.values() {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            ctx.clients.similarity_pacer.wait().await;
            let similar = ctx.clients.similarity.get_similar(&artist.name, self.config.similar_per_artist).await;
            for hit in similar {
                if hit.score < self.config.min_similarity {
                    continue;
                }
                let key = hit.name.to_lowercase();
                if library.contains_key(&key) {
                    continue;
                }
                if ctx.store.is_discovered(&key).map_err(|e| JobError::ExecutionFailed(e.to_string()))? {
                    continue;
                }
                let entry = candidates.entry(key).or_insert_with(|| Candidate {
                    name: hit.name.clone(),
                    canonical_id: hit.canonical_id.clone(),
                    score: 0.0,
                    source_count: 0,
                });
                entry.score += hit.score;
                entry.source_count += 1;
            }
        }

        let mut ranked: Vec<Candidate> = candidates.into_values().collect();
        ranked.sort_by(|a, b| {
            b.source_count
                .cmp(&a.source_count)
                .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal))
        });
        ranked.truncate(self.config.max_artists_per_run);
        debug!("catalog-similarity found {} fresh candidate artists", ranked.len());

        let queue = QueueService::new(Arc::clone(&ctx.store), Arc::clone(&ctx.events));

        for candidate in ranked {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            ctx.clients.similarity_pacer.wait().await;
            let groups = ctx
                .clients
                .metadata
                .search_release_groups(&candidate.name, "album", self.config.albums_per_artist)
                .await;

            for group in groups {
                let canonical_id = candidate.canonical_id.clone().unwrap_or_else(|| group.id.clone());
                if ctx
                    .store
                    .find_queue_item_by_canonical_id(&group.id)
                    .map_err(|e| JobError::ExecutionFailed(e.to_string()))?
                    .is_some()
                {
                    continue;
                }

                let cover_url = ctx.clients.coverart.cover_url(&group.id, 500);
                let year = group.first_release_date.as_deref().and_then(|d| d.get(0..4)).and_then(|y| y.parse().ok());
                let score = (candidate.score * 100.0).round() / 100.0;

                queue
                    .add_pending(
                        group.id,
                        candidate.name.clone(),
                        Some(group.title),
                        None,
                        ContentType::Album,
                        Some(score),
                        QueueSource::Catalog,
                        vec![canonical_id],
                        None,
                        Some(cover_url),
                        year,
                    )
                    .await
                    .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
            }

            ctx.store
                .mark_discovered(candidate.name.to_lowercase())
                .await
                .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;
        }

        Ok(())
    }
}
