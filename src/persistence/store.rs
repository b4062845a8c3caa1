//! The single embedded store.
//!
//! Two connections share one SQLite file: `writer` is gated by
//! [`WriteToken`] (the 5s-timeout permit), `reader` runs in WAL mode
//! and is never blocked by a write in progress. Reads therefore run
//! without acquiring the write token.

use super::models::*;
use super::schema::STORE_VERSIONED_SCHEMAS;
use super::write_token::WriteToken;
use crate::error::{classify_sqlite_error, AppError, AppResult};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex as StdMutex;
use tracing::info;

pub struct Store {
    writer: StdMutex<Connection>,
    reader: StdMutex<Connection>,
    write_token: WriteToken,
}

impl Store {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let mut writer = Connection::open(path).context("failed to open store (writer)")?;
        writer.execute("PRAGMA foreign_keys = ON;", [])?;
        writer.execute("PRAGMA journal_mode = WAL;", [])?;

        let schema = STORE_VERSIONED_SCHEMAS.last().unwrap();
        if is_new_db {
            info!("creating new store at {:?}", path);
            schema.create(&writer)?;
        } else {
            let raw_version: i64 = writer.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;
            if db_version < 0 {
                anyhow::bail!("store version {} is invalid", db_version);
            }
            let version_index = STORE_VERSIONED_SCHEMAS
                .iter()
                .position(|s| s.version == db_version as usize)
                .with_context(|| format!("unknown store version {}", db_version))?;
            STORE_VERSIONED_SCHEMAS[version_index]
                .validate(&writer)
                .with_context(|| format!("store schema validation failed for version {}", db_version))?;
            if (db_version as usize) < schema.version {
                Self::migrate_if_needed(&mut writer, db_version as usize)?;
            }
        }

        let reader = Connection::open(path).context("failed to open store (reader)")?;
        reader.execute("PRAGMA query_only = ON;", [])?;

        Ok(Self {
            writer: StdMutex::new(writer),
            reader: StdMutex::new(reader),
            write_token: WriteToken::new(),
        })
    }

    /// An in-memory store for tests: writer and reader share one named
    /// in-memory database via SQLite's shared-cache URI mode, so reads
    /// observe writes the same way they would against a real file.
    pub fn in_memory() -> Result<Self> {
        use rusqlite::OpenFlags;
        static COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let uri = format!("file:discology-test-{}?mode=memory&cache=shared", id);
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI;

        let writer = Connection::open_with_flags(&uri, flags)?;
        writer.execute("PRAGMA foreign_keys = ON;", [])?;
        STORE_VERSIONED_SCHEMAS.last().unwrap().create(&writer)?;

        let reader = Connection::open_with_flags(&uri, flags)?;

        Ok(Self {
            reader: StdMutex::new(reader),
            writer: StdMutex::new(writer),
            write_token: WriteToken::new(),
        })
    }

    fn migrate_if_needed(conn: &mut Connection, from_version: usize) -> Result<()> {
        let tx = conn.transaction()?;
        let mut latest = from_version;
        for schema in STORE_VERSIONED_SCHEMAS.iter().skip(from_version) {
            if schema.version > from_version {
                if let Some(migration_fn) = schema.migration {
                    migration_fn(&tx)
                        .with_context(|| format!("failed migrating to version {}", schema.version))?;
                }
                latest = schema.version;
            }
        }
        tx.execute(&format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest), [])?;
        tx.commit()?;
        Ok(())
    }

    async fn write<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Connection) -> rusqlite::Result<T> + Send,
        T: Send,
    {
        let _permit = self.write_token.acquire().await?;
        let mut conn = self.writer.lock().unwrap();
        f(&mut conn).map_err(|e| classify_sqlite_error(&e))
    }

    fn read<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.reader.lock().unwrap();
        f(&conn).map_err(|e| classify_sqlite_error(&e))
    }

    // --- Queue (C3) ---------------------------------------------------

    pub async fn enqueue_queue_item(
        &self,
        canonical_id: String,
        artist: String,
        album: Option<String>,
        title: Option<String>,
        item_type: ContentType,
        score: Option<f64>,
        source: QueueSource,
        similar_to: Vec<String>,
        source_track: Option<String>,
        cover_url: Option<String>,
        year: Option<i32>,
    ) -> AppResult<QueueItem> {
        let similar_to_json = to_json_column(&similar_to).map_err(AppError::Internal)?;
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO queue_items
                    (canonical_id, artist, album, title, item_type, status, score, source,
                     similar_to, source_track, cover_url, year)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    canonical_id, artist, album, title, item_type, score, source,
                    similar_to_json, source_track, cover_url, year,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row("SELECT * FROM queue_items WHERE id = ?1", params![id], QueueItem::from_row)
        })
        .await
    }

    pub fn get_queue_item(&self, id: i64) -> AppResult<Option<QueueItem>> {
        self.read(|conn| {
            conn.query_row("SELECT * FROM queue_items WHERE id = ?1", params![id], QueueItem::from_row)
                .optional()
        })
    }

    /// Used by the discovery jobs (C7) to skip a canonical_id that's
    /// already sitting in the queue, regardless of its current status.
    pub fn find_queue_item_by_canonical_id(&self, canonical_id: &str) -> AppResult<Option<QueueItem>> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT * FROM queue_items WHERE canonical_id = ?1",
                params![canonical_id],
                QueueItem::from_row,
            )
            .optional()
        })
    }

    pub fn list_queue_items(&self, status: Option<QueueItemStatus>) -> AppResult<Vec<QueueItem>> {
        self.read(|conn| {
            let (sql, status_owned) = match status {
                Some(s) => ("SELECT * FROM queue_items WHERE status = ?1 ORDER BY score DESC, added_at DESC".to_string(), Some(s)),
                None => ("SELECT * FROM queue_items ORDER BY score DESC, added_at DESC".to_string(), None),
            };
            let mut stmt = conn.prepare(&sql)?;
            let rows = match status_owned {
                Some(s) => stmt.query_map(params![s], QueueItem::from_row)?.collect::<rusqlite::Result<Vec<_>>>(),
                None => stmt.query_map(params![], QueueItem::from_row)?.collect::<rusqlite::Result<Vec<_>>>(),
            };
            rows
        })
    }

    pub async fn set_queue_item_status(&self, id: i64, status: QueueItemStatus) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "UPDATE queue_items SET status = ?1, processed_at = (cast(strftime('%s','now') as int)) WHERE id = ?2",
                params![status, id],
            )
            .map(|_| ())
        })
        .await
    }

    /// Flips every still-pending row among `ids` to approved and
    /// upserts a matching WishlistItem for each, inside one writer
    /// transaction so a partial batch can never land.
    pub async fn approve_queue_items(&self, ids: Vec<i64>) -> AppResult<Vec<QueueItem>> {
        self.write(move |conn| Self::approve_matching(conn, Some(&ids))).await
    }

    pub async fn approve_all_pending(&self) -> AppResult<Vec<QueueItem>> {
        self.write(|conn| Self::approve_matching(conn, None)).await
    }

    fn approve_matching(conn: &mut Connection, ids: Option<&[i64]>) -> rusqlite::Result<Vec<QueueItem>> {
        let tx = conn.transaction()?;
        let pending: Vec<QueueItem> = {
            let mut stmt = match ids {
                Some(_) => tx.prepare("SELECT * FROM queue_items WHERE status = 'pending' AND id = ?1")?,
                None => tx.prepare("SELECT * FROM queue_items WHERE status = 'pending'")?,
            };
            match ids {
                Some(ids) => {
                    let mut items = Vec::new();
                    for id in ids {
                        items.extend(stmt.query_map(params![id], QueueItem::from_row)?.collect::<rusqlite::Result<Vec<_>>>()?);
                    }
                    items
                }
                None => stmt.query_map(params![], QueueItem::from_row)?.collect::<rusqlite::Result<Vec<_>>>()?,
            }
        };

        for item in &pending {
            tx.execute(
                "UPDATE queue_items SET status = 'approved', processed_at = (cast(strftime('%s','now') as int)) WHERE id = ?1",
                params![item.id],
            )?;

            let artist_lower = item.artist.to_lowercase();
            let title = item.album.clone().or_else(|| item.title.clone()).unwrap_or_default();
            let title_lower = title.to_lowercase();
            let wishlist_id = uuid::Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO wishlist_items
                    (id, artist, artist_lower, album, title_lower, item_type, year,
                     canonical_id, source, cover_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(artist_lower, title_lower, item_type) DO UPDATE SET
                    year = COALESCE(wishlist_items.year, excluded.year),
                    cover_url = COALESCE(wishlist_items.cover_url, excluded.cover_url),
                    canonical_id = COALESCE(wishlist_items.canonical_id, excluded.canonical_id),
                    source = COALESCE(wishlist_items.source, excluded.source)",
                params![
                    wishlist_id, item.artist, artist_lower, title, title_lower, item.item_type,
                    item.year, item.canonical_id, item.source, item.cover_url,
                ],
            )?;
        }

        let approved: Vec<QueueItem> = pending
            .into_iter()
            .map(|mut item| {
                item.status = QueueItemStatus::Approved;
                item
            })
            .collect();
        tx.commit()?;
        Ok(approved)
    }

    pub async fn reject_queue_items(&self, ids: Vec<i64>) -> AppResult<usize> {
        self.write(move |conn| {
            let tx = conn.transaction()?;
            let mut affected = 0;
            for id in &ids {
                affected += tx.execute(
                    "UPDATE queue_items SET status = 'rejected', processed_at = (cast(strftime('%s','now') as int))
                     WHERE id = ?1 AND status = 'pending'",
                    params![id],
                )?;
            }
            tx.commit()?;
            Ok(affected)
        })
        .await
    }

    pub fn queue_stats(&self) -> AppResult<(i64, i64, i64)> {
        self.read(|conn| {
            let pending: i64 = conn.query_row("SELECT COUNT(*) FROM queue_items WHERE status = 'pending'", [], |r| r.get(0))?;
            let approved: i64 = conn.query_row("SELECT COUNT(*) FROM queue_items WHERE status = 'approved'", [], |r| r.get(0))?;
            let rejected: i64 = conn.query_row("SELECT COUNT(*) FROM queue_items WHERE status = 'rejected'", [], |r| r.get(0))?;
            Ok((pending, approved, rejected))
        })
    }

    pub fn is_processed(&self, canonical_id: &str) -> AppResult<bool> {
        self.read(|conn| {
            conn.query_row(
                "SELECT 1 FROM processed_recordings WHERE canonical_id = ?1",
                params![canonical_id],
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
        })
    }

    pub async fn mark_processed(&self, canonical_id: String) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO processed_recordings (canonical_id) VALUES (?1)",
                params![canonical_id],
            )
            .map(|_| ())
        })
        .await
    }

    // --- Catalog mirror (C7) -------------------------------------------

    pub async fn upsert_catalog_artist(&self, artist: CatalogArtist) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO catalog_artists (name, name_lower, external_id, last_synced_at)
                 VALUES (?1, ?2, ?3, (cast(strftime('%s','now') as int)))
                 ON CONFLICT(name_lower) DO UPDATE SET
                    name = excluded.name, external_id = excluded.external_id,
                    last_synced_at = excluded.last_synced_at",
                params![artist.name, artist.name_lower, artist.external_id],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn list_catalog_artists(&self) -> AppResult<Vec<CatalogArtist>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT name, name_lower, external_id, last_synced_at FROM catalog_artists")?;
            stmt.query_map(params![], |row| {
                Ok(CatalogArtist {
                    name: row.get("name")?,
                    name_lower: row.get("name_lower")?,
                    external_id: row.get("external_id")?,
                    last_synced_at: row.get("last_synced_at")?,
                })
            })?
            .collect()
        })
    }

    pub fn is_discovered(&self, name_lower: &str) -> AppResult<bool> {
        self.read(|conn| {
            conn.query_row(
                "SELECT 1 FROM discovered_artists WHERE name_lower = ?1",
                params![name_lower],
                |_| Ok(()),
            )
            .optional()
            .map(|r| r.is_some())
        })
    }

    pub async fn mark_discovered(&self, name_lower: String) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO discovered_artists (name_lower) VALUES (?1)",
                params![name_lower],
            )
            .map(|_| ())
        })
        .await
    }

    // --- Wishlist (C4) --------------------------------------------------

    pub async fn insert_wishlist_item(&self, item: WishlistItem) -> AppResult<()> {
        let artist_lower = item.artist_lower();
        let title_lower = item.title_lower();
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO wishlist_items
                    (id, artist, artist_lower, album, title_lower, item_type, year,
                     canonical_id, source, cover_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    item.id, item.artist, artist_lower, item.album, title_lower, item.item_type,
                    item.year, item.canonical_id, item.source, item.cover_url,
                ],
            )
            .map(|_| ())
        })
        .await
    }

    /// Persists a merged `(year, cover_url, canonical_id, source)` for
    /// an existing row — the non-destructive side of the idempotent
    /// upsert in `WishlistService::add`, where the most informative
    /// non-null metadata wins.
    pub async fn update_wishlist_metadata(&self, item: &WishlistItem) -> AppResult<()> {
        let id = item.id.clone();
        let year = item.year;
        let cover_url = item.cover_url.clone();
        let canonical_id = item.canonical_id.clone();
        let source = item.source.clone();
        self.write(move |conn| {
            conn.execute(
                "UPDATE wishlist_items SET year = ?2, cover_url = ?3, canonical_id = ?4, source = ?5 WHERE id = ?1",
                params![id, year, cover_url, canonical_id, source],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn get_wishlist_item(&self, id: &str) -> AppResult<Option<WishlistItem>> {
        self.read(|conn| {
            conn.query_row("SELECT * FROM wishlist_items WHERE id = ?1", params![id], WishlistItem::from_row)
                .optional()
        })
    }

    pub fn find_wishlist_by_key(&self, artist_lower: &str, title_lower: &str, item_type: ContentType) -> AppResult<Option<WishlistItem>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT * FROM wishlist_items WHERE artist_lower = ?1 AND title_lower = ?2 AND item_type = ?3",
                params![artist_lower, title_lower, item_type],
                WishlistItem::from_row,
            )
            .optional()
        })
    }

    pub fn list_wishlist_items(&self) -> AppResult<Vec<WishlistItem>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM wishlist_items ORDER BY added_at DESC")?;
            stmt.query_map(params![], WishlistItem::from_row)?.collect()
        })
    }

    pub async fn mark_wishlist_processed(&self, id: String) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "UPDATE wishlist_items SET processed_at = (cast(strftime('%s','now') as int)) WHERE id = ?1",
                params![id],
            )
            .map(|_| ())
        })
        .await
    }

    pub async fn clear_wishlist_processed(&self, id: &str) -> AppResult<()> {
        let id = id.to_string();
        self.write(move |conn| {
            conn.execute("UPDATE wishlist_items SET processed_at = NULL WHERE id = ?1", params![id]).map(|_| ())
        })
        .await
    }

    pub async fn delete_wishlist_item(&self, id: &str) -> AppResult<()> {
        let id = id.to_string();
        self.write(move |conn| {
            conn.execute("DELETE FROM wishlist_items WHERE id = ?1", params![id]).map(|_| ())
        })
        .await
    }

    // --- Download tasks (C5) --------------------------------------------

    pub async fn insert_download_task(&self, task: DownloadTask) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO download_tasks (id, wishlist_item_id, wishlist_key, status, retry_count)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![task.id, task.wishlist_item_id, task.wishlist_key, task.status, task.retry_count],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn get_download_task(&self, id: &str) -> AppResult<Option<DownloadTask>> {
        self.read(|conn| {
            conn.query_row("SELECT * FROM download_tasks WHERE id = ?1", params![id], DownloadTask::from_row)
                .optional()
        })
    }

    pub fn get_download_task_by_wishlist_key(&self, key: &str) -> AppResult<Option<DownloadTask>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT * FROM download_tasks WHERE wishlist_key = ?1",
                params![key],
                DownloadTask::from_row,
            )
            .optional()
        })
    }

    pub fn list_download_tasks_by_status(&self, status: DownloadStatus) -> AppResult<Vec<DownloadTask>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM download_tasks WHERE status = ?1 ORDER BY queued_at ASC")?;
            stmt.query_map(params![status], DownloadTask::from_row)?.collect()
        })
    }

    /// Replaces every mutable column of a task row. Callers build the
    /// updated `DownloadTask` via the FSM (`crate::download::fsm`) and
    /// persist the result as a whole, rather than issuing per-field
    /// updates — keeps the store ignorant of transition legality.
    pub async fn update_download_task(&self, task: DownloadTask) -> AppResult<()> {
        let search_results_json = task
            .search_results
            .as_ref()
            .map(to_json_column)
            .transpose()
            .map_err(AppError::Internal)?;
        let skipped_json = to_json_column(&task.skipped_usernames).map_err(AppError::Internal)?;
        self.write(move |conn| {
            conn.execute(
                "UPDATE download_tasks SET
                    status = ?1, search_query = ?2, search_results = ?3, selection_expires_at = ?4,
                    skipped_usernames = ?5, peer_username = ?6, peer_directory = ?7, file_count = ?8,
                    expected_track_count = ?9, quality_tier = ?10, quality_format = ?11,
                    quality_bit_rate = ?12, quality_bit_depth = ?13, quality_sample_rate = ?14,
                    download_path = ?15, error_message = ?16, retry_count = ?17, started_at = ?18,
                    completed_at = ?19, organized_at = ?20
                 WHERE id = ?21",
                params![
                    task.status, task.search_query, search_results_json, task.selection_expires_at,
                    skipped_json, task.peer_username, task.peer_directory, task.file_count,
                    task.expected_track_count, task.quality_tier, task.quality_format,
                    task.quality_bit_rate, task.quality_bit_depth, task.quality_sample_rate,
                    task.download_path, task.error_message, task.retry_count, task.started_at,
                    task.completed_at, task.organized_at, task.id,
                ],
            )
            .map(|_| ())
        })
        .await
    }

    // --- Job scheduling ---------------------------------------------------

    pub async fn record_job_start(&self, job_id: String, triggered_by: String) -> AppResult<i64> {
        self.write(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO job_runs (job_id, started_at, status, triggered_by) VALUES (?1, ?2, ?3, ?4)",
                params![job_id, now, JobRunStatus::Running, triggered_by],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn record_job_finish(&self, run_id: i64, status: JobRunStatus, error_message: Option<String>) -> AppResult<()> {
        self.write(move |conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "UPDATE job_runs SET finished_at = ?1, status = ?2, error_message = ?3 WHERE id = ?4",
                params![now, status, error_message, run_id],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn get_running_jobs(&self) -> AppResult<Vec<JobRun>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, job_id, started_at, finished_at, status, error_message, triggered_by
                 FROM job_runs WHERE status = 'running'",
            )?;
            stmt.query_map(params![], Self::row_to_job_run)?.collect()
        })
    }

    pub fn get_job_history(&self, job_id: &str, limit: i64) -> AppResult<Vec<JobRun>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, job_id, started_at, finished_at, status, error_message, triggered_by
                 FROM job_runs WHERE job_id = ?1 ORDER BY started_at DESC LIMIT ?2",
            )?;
            stmt.query_map(params![job_id, limit], Self::row_to_job_run)?.collect()
        })
    }

    pub fn get_last_run(&self, job_id: &str) -> AppResult<Option<JobRun>> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT id, job_id, started_at, finished_at, status, error_message, triggered_by
                 FROM job_runs WHERE job_id = ?1 ORDER BY started_at DESC LIMIT 1",
                params![job_id],
                Self::row_to_job_run,
            )
            .optional()
        })
    }

    pub async fn mark_stale_jobs_failed(&self) -> AppResult<usize> {
        self.write(|conn| {
            conn.execute(
                "UPDATE job_runs SET status = ?1, finished_at = ?2, error_message = 'process restarted while running'
                 WHERE status = ?3",
                params![JobRunStatus::Failed, Utc::now().to_rfc3339(), JobRunStatus::Running],
            )
        })
        .await
    }

    pub fn get_schedule_state(&self, job_id: &str) -> AppResult<Option<JobScheduleState>> {
        self.read(move |conn| {
            conn.query_row(
                "SELECT job_id, next_run_at, last_run_at FROM job_schedule_state WHERE job_id = ?1",
                params![job_id],
                Self::row_to_schedule_state,
            )
            .optional()
        })
    }

    pub async fn update_schedule_state(&self, job_id: String, next_run_at: DateTime<Utc>, last_run_at: Option<DateTime<Utc>>) -> AppResult<()> {
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO job_schedule_state (job_id, next_run_at, last_run_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(job_id) DO UPDATE SET next_run_at = excluded.next_run_at, last_run_at = excluded.last_run_at",
                params![job_id, next_run_at.to_rfc3339(), last_run_at.map(|d| d.to_rfc3339())],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn get_all_schedule_states(&self) -> AppResult<Vec<JobScheduleState>> {
        self.read(|conn| {
            let mut stmt = conn.prepare("SELECT job_id, next_run_at, last_run_at FROM job_schedule_state")?;
            stmt.query_map(params![], Self::row_to_schedule_state)?.collect()
        })
    }

    pub async fn log_job_audit(
        &self,
        job_id: String,
        event_type: JobAuditEventType,
        duration_ms: Option<i64>,
        details: Option<serde_json::Value>,
        error: Option<String>,
    ) -> AppResult<()> {
        let details_json = details.as_ref().map(to_json_column).transpose().map_err(AppError::Internal)?;
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO job_audit_log (job_id, event_type, duration_ms, details, error)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![job_id, event_type, duration_ms, details_json, error],
            )
            .map(|_| ())
        })
        .await
    }

    pub fn get_job_audit_log(&self, limit: i64) -> AppResult<Vec<JobAuditEntry>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare("SELECT * FROM job_audit_log ORDER BY timestamp DESC LIMIT ?1")?;
            stmt.query_map(params![limit], Self::row_to_audit_entry)?.collect()
        })
    }

    pub fn get_job_audit_log_by_job(&self, job_id: &str, limit: i64) -> AppResult<Vec<JobAuditEntry>> {
        self.read(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM job_audit_log WHERE job_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            )?;
            stmt.query_map(params![job_id, limit], Self::row_to_audit_entry)?.collect()
        })
    }

    pub async fn cleanup_old_job_audit_entries(&self, older_than_secs: i64) -> AppResult<usize> {
        self.write(move |conn| {
            let cutoff = Utc::now().timestamp() - older_than_secs;
            conn.execute("DELETE FROM job_audit_log WHERE timestamp < ?1", params![cutoff])
        })
        .await
    }

    fn row_to_job_run(row: &rusqlite::Row) -> rusqlite::Result<JobRun> {
        let started_at_str: String = row.get("started_at")?;
        let finished_at_str: Option<String> = row.get("finished_at")?;
        Ok(JobRun {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            started_at: DateTime::parse_from_rfc3339(&started_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            finished_at: finished_at_str.and_then(|s| {
                DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)).ok()
            }),
            status: row.get("status")?,
            error_message: row.get("error_message")?,
            triggered_by: row.get("triggered_by")?,
        })
    }

    fn row_to_schedule_state(row: &rusqlite::Row) -> rusqlite::Result<JobScheduleState> {
        let next_run_at_str: String = row.get("next_run_at")?;
        let last_run_at_str: Option<String> = row.get("last_run_at")?;
        Ok(JobScheduleState {
            job_id: row.get("job_id")?,
            next_run_at: DateTime::parse_from_rfc3339(&next_run_at_str)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            last_run_at: last_run_at_str.and_then(|s| {
                DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)).ok()
            }),
        })
    }

    fn row_to_audit_entry(row: &rusqlite::Row) -> rusqlite::Result<JobAuditEntry> {
        let details_str: Option<String> = row.get("details")?;
        Ok(JobAuditEntry {
            id: row.get("id")?,
            job_id: row.get("job_id")?,
            event_type: row.get("event_type")?,
            timestamp: row.get("timestamp")?,
            duration_ms: row.get("duration_ms")?,
            details: details_str.and_then(|s| serde_json::from_str(&s).ok()),
            error: row.get("error")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Store {
        Store::in_memory().unwrap()
    }

    #[tokio::test]
    async fn enqueue_and_fetch_queue_item() {
        let store = store();
        let item = store
            .enqueue_queue_item(
                "mb:abc".into(), "Some Artist".into(), Some("Some Album".into()), None,
                ContentType::Album, Some(0.8), QueueSource::Recommender,
                vec!["Other Artist".into()], None, None, Some(2020),
            )
            .await
            .unwrap();
        assert_eq!(item.status, QueueItemStatus::Pending);
        let fetched = store.get_queue_item(item.id).unwrap().unwrap();
        assert_eq!(fetched.canonical_id, "mb:abc");
        assert_eq!(fetched.similar_to, vec!["Other Artist".to_string()]);
    }

    #[tokio::test]
    async fn processed_recordings_dedupe() {
        let store = store();
        assert!(!store.is_processed("mb:x").unwrap());
        store.mark_processed("mb:x".into()).await.unwrap();
        assert!(store.is_processed("mb:x").unwrap());
        // idempotent
        store.mark_processed("mb:x".into()).await.unwrap();
    }

    #[tokio::test]
    async fn wishlist_unique_constraint_rejects_duplicate_key() {
        let store = store();
        let item = WishlistItem {
            id: "w1".into(), artist: "Artist".into(), album: "Album".into(),
            item_type: ContentType::Album, year: None, canonical_id: None,
            source: None, cover_url: None, added_at: 0, processed_at: None,
        };
        store.insert_wishlist_item(item.clone()).await.unwrap();
        let mut dup = item;
        dup.id = "w2".into();
        let err = store.insert_wishlist_item(dup).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
