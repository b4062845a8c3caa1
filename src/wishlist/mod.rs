//! The wishlist service.

use crate::error::{AppError, AppResult};
use crate::events::EventBus;
use crate::persistence::{ContentType, Store, WishlistItem};
use std::sync::Arc;
use uuid::Uuid;

pub struct ImportOutcome {
    pub added: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

pub struct WishlistService {
    store: Arc<Store>,
    #[allow(dead_code)]
    events: Arc<EventBus>,
}

impl WishlistService {
    pub fn new(store: Arc<Store>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub fn list(&self) -> AppResult<Vec<WishlistItem>> {
        self.store.list_wishlist_items()
    }

    pub fn get(&self, id: &str) -> AppResult<WishlistItem> {
        self.store
            .get_wishlist_item(id)?
            .ok_or_else(|| AppError::NotFound(format!("wishlist item {} not found", id)))
    }

    /// Idempotent upsert keyed on (artist_lower, title_lower, type): if
    /// a record exists, the most informative non-null metadata wins.
    pub async fn add(
        &self,
        artist: String,
        album: String,
        item_type: ContentType,
        year: Option<i32>,
        canonical_id: Option<String>,
        source: Option<String>,
        cover_url: Option<String>,
    ) -> AppResult<WishlistItem> {
        let artist_lower = artist.to_lowercase();
        let title_lower = album.to_lowercase();
        if let Some(mut existing) = self.store.find_wishlist_by_key(&artist_lower, &title_lower, item_type)? {
            existing.year = existing.year.or(year);
            existing.cover_url = existing.cover_url.or(cover_url);
            existing.canonical_id = existing.canonical_id.or(canonical_id);
            existing.source = existing.source.or(source);
            self.store.update_wishlist_metadata(&existing).await?;
            return Ok(existing);
        }

        let item = WishlistItem {
            id: Uuid::new_v4().to_string(),
            artist,
            album,
            item_type,
            year,
            canonical_id,
            source,
            cover_url,
            added_at: 0,
            processed_at: None,
        };
        self.store.insert_wishlist_item(item.clone()).await?;
        Ok(item)
    }

    pub async fn delete(&self, id: &str) -> AppResult<()> {
        self.get(id)?;
        self.store.delete_wishlist_item(id).await
    }

    pub async fn bulk_delete(&self, ids: Vec<String>) -> AppResult<usize> {
        let mut count = 0;
        for id in ids {
            if self.store.delete_wishlist_item(&id).await.is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Clears `processed_at`; the download driver (C7) picks the item
    /// back up on its next tick and creates a fresh DownloadTask.
    pub async fn requeue(&self, id: &str) -> AppResult<()> {
        self.get(id)?;
        self.store.clear_wishlist_processed(id).await
    }

    pub async fn bulk_requeue(&self, ids: Vec<String>) -> AppResult<usize> {
        let mut count = 0;
        for id in ids {
            if self.store.clear_wishlist_processed(&id).await.is_ok() {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn export(&self) -> AppResult<serde_json::Value> {
        let items = self.list()?;
        serde_json::to_value(items).map_err(|e| AppError::Internal(e.into()))
    }

    pub async fn import(&self, items: Vec<WishlistItem>) -> ImportOutcome {
        let mut outcome = ImportOutcome { added: 0, skipped: 0, errors: Vec::new() };
        for item in items {
            let existing = self
                .store
                .find_wishlist_by_key(&item.artist.to_lowercase(), &item.album.to_lowercase(), item.item_type);
            match existing {
                Ok(Some(_)) => outcome.skipped += 1,
                Ok(None) => {
                    match self
                        .add(item.artist, item.album, item.item_type, item.year, item.canonical_id, item.source, item.cover_url)
                        .await
                    {
                        Ok(_) => outcome.added += 1,
                        Err(e) => outcome.errors.push(e.to_string()),
                    }
                }
                Err(e) => outcome.errors.push(e.to_string()),
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> WishlistService {
        WishlistService::new(Arc::new(Store::in_memory().unwrap()), Arc::new(EventBus::new()))
    }

    #[tokio::test]
    async fn add_is_idempotent_and_fills_in_missing_metadata() {
        let svc = service();
        let first = svc
            .add("Artist".into(), "Album".into(), ContentType::Album, None, None, None, None)
            .await
            .unwrap();
        let second = svc
            .add("artist".into(), "album".into(), ContentType::Album, Some(2020), None, None, Some("http://x".into()))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.year, Some(2020));
        assert_eq!(second.cover_url, Some("http://x".into()));

        // the merge must be persisted, not just returned
        let reloaded = svc.get(&first.id).unwrap();
        assert_eq!(reloaded.year, Some(2020));
        assert_eq!(reloaded.cover_url, Some("http://x".into()));
    }

    #[tokio::test]
    async fn requeue_clears_processed_at() {
        let svc = service();
        let item = svc
            .add("Artist".into(), "Album".into(), ContentType::Album, None, None, None, None)
            .await
            .unwrap();
        svc.store.mark_wishlist_processed(item.id.clone()).await.unwrap();
        assert!(svc.get(&item.id).unwrap().processed_at.is_some());
        svc.requeue(&item.id).await.unwrap();
        assert!(svc.get(&item.id).unwrap().processed_at.is_none());
    }
}
