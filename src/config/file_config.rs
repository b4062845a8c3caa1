use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_dir: Option<String>,
    pub debug: Option<bool>,
    /// "album" (default) or "track" — content-type granularity for
    /// recommendations that don't already carry their own release.
    pub mode: Option<String>,
    pub fetch_count: Option<usize>,
    pub min_score: Option<f64>,

    pub listenbrainz: Option<ListenBrainzConfig>,
    pub slskd: Option<SlskdConfig>,
    pub catalog_discovery: Option<CatalogDiscoveryConfig>,
    pub library_duplicate: Option<LibraryDuplicateConfig>,
    pub library_organize: Option<LibraryOrganizeConfig>,
    pub preview: Option<PreviewConfig>,
    pub ui: Option<UiConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ListenBrainzConfig {
    pub base_url: Option<String>,
    pub user: Option<String>,
    pub token: Option<String>,
    pub interval_secs: Option<u64>,
    /// Approve fresh recommendations straight to the wishlist instead
    /// of leaving them pending for curation.
    pub auto_approve: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SlskdConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub search_timeout_ms: Option<u64>,
    pub min_responses: Option<usize>,
    pub selection_timeout_hours: Option<i64>,
    pub downloads_root: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogDiscoveryConfig {
    pub enabled: Option<bool>,
    pub library_base_url: Option<String>,
    pub library_salt: Option<String>,
    pub similarity_base_url: Option<String>,
    pub similarity_api_key: Option<String>,
    pub similar_per_artist: Option<usize>,
    pub albums_per_artist: Option<usize>,
    pub max_artists_per_run: Option<usize>,
    pub min_similarity: Option<f64>,
    pub interval_secs: Option<u64>,
}

/// Governs whether a queued item whose artist/album already exists in
/// the library mirror is surfaced or hidden by default.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LibraryDuplicateConfig {
    pub hide_in_library_by_default: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LibraryOrganizeConfig {
    pub prefer_album_folder: Option<bool>,
    pub exclude_terms: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PreviewConfig {
    pub enabled: Option<bool>,
    pub cache_age_sec: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UiConfig {
    pub page_size: Option<usize>,
    pub theme: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
