//! Versioned schema for the single embedded store.
//!
//! Declares every table in the `VersionedSchema` DSL. Schema evolution
//! is idempotent: `VersionedSchema::create`/`validate` and the
//! migration callbacks never drop or rename columns.

use crate::sqlite_persistence::versioned_schema::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const QUEUE_ITEMS: Table = Table {
    name: "queue_items",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "canonical_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: true, default_value: None, foreign_key: None },
        Column { name: "artist", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "album", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "title", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "item_type", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "status", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: Some("'pending'"), foreign_key: None },
        Column { name: "score", sql_type: &SqlType::Real, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "source", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "similar_to", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "source_track", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "cover_url", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "year", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "added_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
        Column { name: "processed_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[
        ("idx_queue_items_status", "status"),
        ("idx_queue_items_added_at", "added_at"),
        ("idx_queue_items_source", "source"),
    ],
    unique_constraints: &[],
};

const PROCESSED_RECORDINGS: Table = Table {
    name: "processed_recordings",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "canonical_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: true, default_value: None, foreign_key: None },
        Column { name: "recorded_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
    ],
    indices: &[],
    unique_constraints: &[],
};

const CATALOG_ARTISTS: Table = Table {
    name: "catalog_artists",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "name", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "name_lower", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: true, default_value: None, foreign_key: None },
        Column { name: "external_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "last_synced_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
    ],
    indices: &[],
    unique_constraints: &[],
};

const DISCOVERED_ARTISTS: Table = Table {
    name: "discovered_artists",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "name_lower", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: true, default_value: None, foreign_key: None },
        Column { name: "discovered_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
    ],
    indices: &[],
    unique_constraints: &[],
};

const WISHLIST_ITEMS: Table = Table {
    name: "wishlist_items",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Text, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "artist", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "artist_lower", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "album", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "title_lower", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "item_type", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "year", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "canonical_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "source", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "cover_url", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "added_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
        Column { name: "processed_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[("idx_wishlist_processed_at", "processed_at")],
    unique_constraints: &[&["artist_lower", "title_lower", "item_type"]],
};

const DOWNLOAD_TASK_PARENT_FK: ForeignKey = ForeignKey {
    foreign_table: "wishlist_items",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const DOWNLOAD_TASKS: Table = Table {
    name: "download_tasks",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Text, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "wishlist_item_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: Some(&DOWNLOAD_TASK_PARENT_FK) },
        Column { name: "wishlist_key", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: true, default_value: None, foreign_key: None },
        Column { name: "status", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: Some("'pending'"), foreign_key: None },
        Column { name: "search_query", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "search_results", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "selection_expires_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "skipped_usernames", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "peer_username", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "peer_directory", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "file_count", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "expected_track_count", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "quality_tier", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "quality_format", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "quality_bit_rate", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "quality_bit_depth", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "quality_sample_rate", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "download_path", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "error_message", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "retry_count", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some("0"), foreign_key: None },
        Column { name: "queued_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
        Column { name: "started_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "completed_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "organized_at", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[
        ("idx_download_tasks_status", "status"),
        ("idx_download_tasks_peer_username", "peer_username"),
        ("idx_download_tasks_wishlist_item", "wishlist_item_id"),
    ],
    unique_constraints: &[],
};

const JOB_RUNS: Table = Table {
    name: "job_runs",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "job_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "started_at", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "finished_at", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "status", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "error_message", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "triggered_by", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[("idx_job_runs_job_id", "job_id")],
    unique_constraints: &[],
};

const JOB_SCHEDULE_STATE: Table = Table {
    name: "job_schedule_state",
    columns: &[
        Column { name: "job_id", sql_type: &SqlType::Text, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "next_run_at", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "last_run_at", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[],
    unique_constraints: &[],
};

const JOB_AUDIT_LOG: Table = Table {
    name: "job_audit_log",
    columns: &[
        Column { name: "id", sql_type: &SqlType::Integer, is_primary_key: true, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "job_id", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "event_type", sql_type: &SqlType::Text, is_primary_key: false, non_null: true, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "timestamp", sql_type: &SqlType::Integer, is_primary_key: false, non_null: true, is_unique: false, default_value: Some(DEFAULT_TIMESTAMP), foreign_key: None },
        Column { name: "duration_ms", sql_type: &SqlType::Integer, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "details", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
        Column { name: "error", sql_type: &SqlType::Text, is_primary_key: false, non_null: false, is_unique: false, default_value: None, foreign_key: None },
    ],
    indices: &[("idx_job_audit_log_job_id", "job_id")],
    unique_constraints: &[],
};

pub static STORE_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        QUEUE_ITEMS,
        PROCESSED_RECORDINGS,
        CATALOG_ARTISTS,
        DISCOVERED_ARTISTS,
        WISHLIST_ITEMS,
        DOWNLOAD_TASKS,
        JOB_RUNS,
        JOB_SCHEDULE_STATE,
        JOB_AUDIT_LOG,
    ],
    migration: None,
}];
