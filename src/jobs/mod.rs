//! Discovery and download jobs — the concrete `BackgroundJob`
//! implementations registered with the scheduler.

mod audit_log_pruning;
mod catalog_similarity;
mod download_driver;
mod recommender_fetch;
mod stale_selection_sweep;

pub use audit_log_pruning::{AuditLogPruningConfig, AuditLogPruningJob};
pub use catalog_similarity::{CatalogSimilarityConfig, CatalogSimilarityJob};
pub use download_driver::{DownloadDriverConfig, DownloadDriverJob};
pub use recommender_fetch::{RecommenderFetchConfig, RecommenderFetchJob};
pub use stale_selection_sweep::{StaleSelectionSweepConfig, StaleSelectionSweepJob};
