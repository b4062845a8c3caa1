//! The queue service.
//!
//! A thin, stateless façade over [`crate::persistence::Store`] that
//! adds sorting/paging/filtering and event emission around the raw
//! CRUD the store exposes.

use crate::error::AppResult;
use crate::events::{EventBus, QueueEvent};
use crate::persistence::{QueueItem, QueueItemStatus, QueueSource, Store};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    AddedAt,
    Score,
    Artist,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

pub struct QueuePage {
    pub items: Vec<QueueItem>,
    pub total: usize,
}

pub struct QueueStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
}

pub struct QueueService {
    store: Arc<Store>,
    events: Arc<EventBus>,
}

impl QueueService {
    pub fn new(store: Arc<Store>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub fn get_pending(
        &self,
        source: Option<QueueSource>,
        sort: SortKey,
        order: SortOrder,
        limit: usize,
        offset: usize,
    ) -> AppResult<QueuePage> {
        let mut items = self.store.list_queue_items(Some(QueueItemStatus::Pending))?;
        if let Some(source) = source {
            items.retain(|i| i.source == source);
        }

        items.sort_by(|a, b| {
            let ordering = match sort {
                SortKey::AddedAt => a.added_at.cmp(&b.added_at),
                SortKey::Score => a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal),
                SortKey::Artist => a.artist.cmp(&b.artist),
                SortKey::Year => a.year.cmp(&b.year),
            };
            match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = items.len();
        let page = items.into_iter().skip(offset).take(limit).collect();
        Ok(QueuePage { items: page, total })
    }

    pub async fn approve(&self, ids: Vec<i64>) -> AppResult<usize> {
        let approved = self.store.approve_queue_items(ids).await?;
        self.after_approve(&approved);
        Ok(approved.len())
    }

    pub async fn approve_all(&self) -> AppResult<usize> {
        let approved = self.store.approve_all_pending().await?;
        self.after_approve(&approved);
        Ok(approved.len())
    }

    fn after_approve(&self, approved: &[QueueItem]) {
        for item in approved {
            self.events.emit_queue(QueueEvent::ItemUpdated { id: item.id });
        }
        if !approved.is_empty() {
            self.emit_stats();
        }
    }

    pub async fn reject(&self, ids: Vec<i64>) -> AppResult<usize> {
        let affected = self.store.reject_queue_items(ids.clone()).await?;
        for id in ids {
            self.events.emit_queue(QueueEvent::ItemUpdated { id });
        }
        if affected > 0 {
            self.emit_stats();
        }
        Ok(affected)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn add_pending(
        &self,
        canonical_id: String,
        artist: String,
        album: Option<String>,
        title: Option<String>,
        item_type: crate::persistence::ContentType,
        score: Option<f64>,
        source: QueueSource,
        similar_to: Vec<String>,
        source_track: Option<String>,
        cover_url: Option<String>,
        year: Option<i32>,
    ) -> AppResult<QueueItem> {
        let item = self
            .store
            .enqueue_queue_item(
                canonical_id, artist, album, title, item_type, score, source, similar_to,
                source_track, cover_url, year,
            )
            .await?;
        self.events.emit_queue(QueueEvent::ItemAdded { id: item.id });
        self.emit_stats();
        Ok(item)
    }

    pub fn is_pending(&self, id: i64) -> AppResult<bool> {
        Ok(self
            .store
            .get_queue_item(id)?
            .map(|i| i.status == QueueItemStatus::Pending)
            .unwrap_or(false))
    }

    pub fn is_rejected(&self, id: i64) -> AppResult<bool> {
        Ok(self
            .store
            .get_queue_item(id)?
            .map(|i| i.status == QueueItemStatus::Rejected)
            .unwrap_or(false))
    }

    pub fn stats(&self) -> AppResult<QueueStats> {
        let (pending, approved, rejected) = self.store.queue_stats()?;
        Ok(QueueStats { pending, approved, rejected })
    }

    fn emit_stats(&self) {
        match self.stats() {
            Ok(stats) => self.events.emit_queue(QueueEvent::StatsUpdated {
                pending: stats.pending,
                approved: stats.approved,
                rejected: stats.rejected,
            }),
            Err(e) => tracing::warn!("failed to compute queue stats for event emission: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::ContentType;

    fn service() -> QueueService {
        QueueService::new(Arc::new(Store::in_memory().unwrap()), Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn approve_moves_item_to_wishlist() {
        let svc = service();
        let item = svc
            .add_pending(
                "mb:1".into(), "Artist".into(), Some("Album".into()), None,
                ContentType::Album, Some(0.5), QueueSource::Recommender, vec![], None, None, None,
            )
            .await
            .unwrap();
        assert!(svc.is_pending(item.id).unwrap());

        let affected = svc.approve(vec![item.id]).await.unwrap();
        assert_eq!(affected, 1);
        assert!(!svc.is_pending(item.id).unwrap());

        let wishlist = svc.store.list_wishlist_items().unwrap();
        assert_eq!(wishlist.len(), 1);
        assert_eq!(wishlist[0].artist, "Artist");
    }

    #[tokio::test]
    async fn reject_only_affects_pending_rows() {
        let svc = service();
        let item = svc
            .add_pending(
                "mb:2".into(), "Artist".into(), None, Some("Title".into()),
                ContentType::Track, None, QueueSource::Catalog, vec![], None, None, None,
            )
            .await
            .unwrap();
        svc.reject(vec![item.id]).await.unwrap();
        assert!(svc.is_rejected(item.id).unwrap());
        // second rejection affects nothing
        let affected = svc.reject(vec![item.id]).await.unwrap();
        assert_eq!(affected, 0);
    }
}
