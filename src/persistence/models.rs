//! Typed entities over the single embedded store.

use anyhow::{Context, Result};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// Implements `FromSql`/`ToSql` for a fieldless enum via `Display`/`FromStr`,
/// so it round-trips through a TEXT column without a manual match arm
/// at every call site.
macro_rules! sql_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let text = value.as_str()?;
                Self::parse(text).ok_or_else(|| FromSqlError::Other(
                    format!("unrecognized {} value: {}", stringify!($name), text).into(),
                ))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Album,
    Track,
}
sql_enum!(ContentType { Album => "album", Track => "track" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueItemStatus {
    Pending,
    Approved,
    Rejected,
}
sql_enum!(QueueItemStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueSource {
    Recommender,
    Catalog,
}
sql_enum!(QueueSource { Recommender => "recommender", Catalog => "catalog" });

/// The 8-state FSM driving acquisition. See [`crate::download::fsm`]
/// for the legal-transition table; this is just the storage repr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadStatus {
    Pending,
    Searching,
    PendingSelection,
    Deferred,
    Queued,
    Downloading,
    Completed,
    Failed,
}
sql_enum!(DownloadStatus {
    Pending => "pending",
    Searching => "searching",
    PendingSelection => "pending_selection",
    Deferred => "deferred",
    Queued => "queued",
    Downloading => "downloading",
    Completed => "completed",
    Failed => "failed",
});

impl DownloadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadStatus::Completed | DownloadStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    Unknown,
    Low,
    Standard,
    High,
    Lossless,
}
sql_enum!(QualityTier {
    Unknown => "unknown",
    Low => "low",
    Standard => "standard",
    High => "high",
    Lossless => "lossless",
});

impl QualityTier {
    /// Flat per-tier score contribution used by candidate ranking.
    pub fn score(&self) -> f64 {
        match self {
            QualityTier::Lossless => 1000.0,
            QualityTier::High => 700.0,
            QualityTier::Standard => 400.0,
            QualityTier::Low => 100.0,
            QualityTier::Unknown => 0.0,
        }
    }
}

/// A candidate recommendation awaiting human curation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: i64,
    pub canonical_id: String,
    pub artist: String,
    pub album: Option<String>,
    pub title: Option<String>,
    pub item_type: ContentType,
    pub status: QueueItemStatus,
    pub score: Option<f64>,
    pub source: QueueSource,
    pub similar_to: Vec<String>,
    pub source_track: Option<String>,
    pub cover_url: Option<String>,
    pub year: Option<i32>,
    pub added_at: i64,
    pub processed_at: Option<i64>,
}

impl QueueItem {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let similar_to_json: Option<String> = row.get("similar_to")?;
        Ok(Self {
            id: row.get("id")?,
            canonical_id: row.get("canonical_id")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            title: row.get("title")?,
            item_type: row.get("item_type")?,
            status: row.get("status")?,
            score: row.get("score")?,
            source: row.get("source")?,
            similar_to: similar_to_json
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            source_track: row.get("source_track")?,
            cover_url: row.get("cover_url")?,
            year: row.get("year")?,
            added_at: row.get("added_at")?,
            processed_at: row.get("processed_at")?,
        })
    }
}

/// A canonical_id already emitted by a discovery source.
#[derive(Debug, Clone)]
pub struct ProcessedRecording {
    pub canonical_id: String,
    pub recorded_at: i64,
}

/// A mirror of one artist from the user's library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogArtist {
    pub name: String,
    pub name_lower: String,
    pub external_id: Option<String>,
    pub last_synced_at: i64,
}

/// An artist already considered by catalog-similarity.
#[derive(Debug, Clone)]
pub struct DiscoveredArtist {
    pub name_lower: String,
    pub discovered_at: i64,
}

/// An approved acquisition intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: String,
    pub artist: String,
    pub album: String,
    pub item_type: ContentType,
    pub year: Option<i32>,
    pub canonical_id: Option<String>,
    pub source: Option<String>,
    pub cover_url: Option<String>,
    pub added_at: i64,
    pub processed_at: Option<i64>,
}

impl WishlistItem {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            item_type: row.get("item_type")?,
            year: row.get("year")?,
            canonical_id: row.get("canonical_id")?,
            source: row.get("source")?,
            cover_url: row.get("cover_url")?,
            added_at: row.get("added_at")?,
            processed_at: row.get("processed_at")?,
        })
    }

    pub fn artist_lower(&self) -> String {
        self.artist.to_lowercase()
    }

    pub fn title_lower(&self) -> String {
        self.album.to_lowercase()
    }

    /// `"<artist> - <title>"`, used to dedupe download tasks (Glossary: Wishlist key).
    pub fn wishlist_key(&self) -> String {
        format!("{} - {}", self.artist, self.album)
    }
}

/// The acquisition state of one WishlistItem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadTask {
    pub id: String,
    pub wishlist_item_id: String,
    pub wishlist_key: String,
    pub status: DownloadStatus,
    pub search_query: Option<String>,
    pub search_results: Option<serde_json::Value>,
    pub selection_expires_at: Option<i64>,
    pub skipped_usernames: Vec<String>,
    pub peer_username: Option<String>,
    pub peer_directory: Option<String>,
    pub file_count: Option<i64>,
    pub expected_track_count: Option<i64>,
    pub quality_tier: Option<QualityTier>,
    pub quality_format: Option<String>,
    pub quality_bit_rate: Option<i64>,
    pub quality_bit_depth: Option<i64>,
    pub quality_sample_rate: Option<i64>,
    pub download_path: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub queued_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub organized_at: Option<i64>,
}

impl DownloadTask {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let search_results_json: Option<String> = row.get("search_results")?;
        let skipped_json: Option<String> = row.get("skipped_usernames")?;
        Ok(Self {
            id: row.get("id")?,
            wishlist_item_id: row.get("wishlist_item_id")?,
            wishlist_key: row.get("wishlist_key")?,
            status: row.get("status")?,
            search_query: row.get("search_query")?,
            search_results: search_results_json.and_then(|s| serde_json::from_str(&s).ok()),
            selection_expires_at: row.get("selection_expires_at")?,
            skipped_usernames: skipped_json
                .and_then(|s| serde_json::from_str(&s).ok())
                .unwrap_or_default(),
            peer_username: row.get("peer_username")?,
            peer_directory: row.get("peer_directory")?,
            file_count: row.get("file_count")?,
            expected_track_count: row.get("expected_track_count")?,
            quality_tier: row.get("quality_tier")?,
            quality_format: row.get("quality_format")?,
            quality_bit_rate: row.get("quality_bit_rate")?,
            quality_bit_depth: row.get("quality_bit_depth")?,
            quality_sample_rate: row.get("quality_sample_rate")?,
            download_path: row.get("download_path")?,
            error_message: row.get("error_message")?,
            retry_count: row.get("retry_count")?,
            queued_at: row.get("queued_at")?,
            started_at: row.get("started_at")?,
            completed_at: row.get("completed_at")?,
            organized_at: row.get("organized_at")?,
        })
    }
}

pub fn to_json_column<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("failed to serialize JSON column")
}

/// Job scheduling / run-history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobRunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}
sql_enum!(JobRunStatus {
    Running => "running",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone)]
pub struct JobRun {
    pub id: i64,
    pub job_id: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub status: JobRunStatus,
    pub error_message: Option<String>,
    pub triggered_by: String,
}

#[derive(Debug, Clone)]
pub struct JobScheduleState {
    pub job_id: String,
    pub next_run_at: chrono::DateTime<chrono::Utc>,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobAuditEventType {
    Started,
    Progress,
    Completed,
    Failed,
    Cancelled,
}
sql_enum!(JobAuditEventType {
    Started => "started",
    Progress => "progress",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone)]
pub struct JobAuditEntry {
    pub id: i64,
    pub job_id: String,
    pub event_type: JobAuditEventType,
    pub timestamp: i64,
    pub duration_ms: Option<i64>,
    pub details: Option<serde_json::Value>,
    pub error: Option<String>,
}
