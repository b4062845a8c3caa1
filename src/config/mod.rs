//! Configuration loading and validation: a `clap` CLI merged with a
//! TOML [`FileConfig`], resolved via `resolve(cli, file)` into a single
//! validated struct so the rest of the crate never has to think about
//! partially-specified config again.

mod file_config;

pub use file_config::{
    CatalogDiscoveryConfig, FileConfig, LibraryDuplicateConfig, LibraryOrganizeConfig,
    ListenBrainzConfig, PreviewConfig, SlskdConfig, UiConfig,
};

use anyhow::{bail, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Recommendation granularity: album mode resolves a recommended
/// recording to its containing release before queueing it; track mode
/// queues the recording itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    Album,
    Track,
}

impl ContentMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            _ => None,
        }
    }
}

/// CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct ListenBrainzSettings {
    pub base_url: String,
    pub user: String,
    pub token: String,
    pub interval: Duration,
    pub auto_approve: bool,
}

#[derive(Debug, Clone)]
pub struct SlskdSettings {
    pub base_url: String,
    pub api_key: String,
    pub search_timeout_ms: u64,
    pub min_responses: usize,
    pub selection_timeout_hours: i64,
    pub downloads_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct CatalogDiscoverySettings {
    pub enabled: bool,
    pub library_base_url: String,
    pub library_salt: String,
    pub similarity_base_url: String,
    pub similarity_api_key: String,
    pub similar_per_artist: usize,
    pub albums_per_artist: usize,
    pub max_artists_per_run: usize,
    pub min_similarity: f64,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct LibraryDuplicateSettings {
    pub hide_in_library_by_default: bool,
}

#[derive(Debug, Clone)]
pub struct LibraryOrganizeSettings {
    pub prefer_album_folder: bool,
    pub exclude_terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PreviewSettings {
    pub enabled: bool,
    pub cache_age_sec: usize,
}

#[derive(Debug, Clone)]
pub struct UiSettings {
    pub page_size: usize,
    pub theme: String,
}

/// The validated, defaults-applied configuration every component
/// reads from. Never deserialized directly — always produced by
/// [`AppConfig::resolve`] from a [`CliConfig`] plus an optional
/// [`FileConfig`], so every field is guaranteed present.
#[derive(Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub debug: bool,
    pub mode: ContentMode,
    pub fetch_count: usize,
    pub min_score: f64,

    pub listenbrainz: ListenBrainzSettings,
    pub slskd: SlskdSettings,
    pub catalog_discovery: CatalogDiscoverySettings,
    pub library_duplicate: LibraryDuplicateSettings,
    pub library_organize: LibraryOrganizeSettings,
    pub preview: PreviewSettings,
    pub ui: UiSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where both apply;
    /// anything neither supplies falls back to the defaults below.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow::anyhow!("db_dir must be specified via --db-dir or in config file"))?;
        if !db_dir.exists() {
            bail!("database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let debug = file.debug.unwrap_or(cli.debug);
        let mode = file
            .mode
            .as_deref()
            .and_then(ContentMode::parse)
            .unwrap_or(ContentMode::Album);
        let fetch_count = file.fetch_count.unwrap_or(25);
        let min_score = file.min_score.unwrap_or(0.0);

        let lb = file.listenbrainz.unwrap_or_default();
        let listenbrainz = ListenBrainzSettings {
            base_url: lb.base_url.unwrap_or_else(|| "https://api.listenbrainz.org".to_string()),
            user: lb.user.ok_or_else(|| anyhow::anyhow!("listenbrainz.user must be configured"))?,
            token: lb.token.ok_or_else(|| anyhow::anyhow!("listenbrainz.token must be configured"))?,
            interval: Duration::from_secs(lb.interval_secs.unwrap_or(3600)),
            auto_approve: lb.auto_approve.unwrap_or(false),
        };

        let slskd_file = file.slskd.unwrap_or_default();
        let slskd = SlskdSettings {
            base_url: slskd_file.base_url.ok_or_else(|| anyhow::anyhow!("slskd.base_url must be configured"))?,
            api_key: slskd_file.api_key.unwrap_or_default(),
            search_timeout_ms: slskd_file.search_timeout_ms.unwrap_or(15_000),
            min_responses: slskd_file.min_responses.unwrap_or(1),
            selection_timeout_hours: slskd_file.selection_timeout_hours.unwrap_or(24),
            downloads_root: slskd_file.downloads_root.map(PathBuf::from).unwrap_or_else(|| db_dir.join("downloads")),
        };

        let cd = file.catalog_discovery.unwrap_or_default();
        let catalog_discovery = CatalogDiscoverySettings {
            enabled: cd.enabled.unwrap_or(false),
            library_base_url: cd.library_base_url.unwrap_or_default(),
            library_salt: cd.library_salt.unwrap_or_default(),
            similarity_base_url: cd
                .similarity_base_url
                .unwrap_or_else(|| "https://ws.audioscrobbler.com/2.0/".to_string()),
            similarity_api_key: cd.similarity_api_key.unwrap_or_default(),
            similar_per_artist: cd.similar_per_artist.unwrap_or(20),
            albums_per_artist: cd.albums_per_artist.unwrap_or(3),
            max_artists_per_run: cd.max_artists_per_run.unwrap_or(10),
            min_similarity: cd.min_similarity.unwrap_or(0.3),
            interval: Duration::from_secs(cd.interval_secs.unwrap_or(86_400)),
        };

        let ld = file.library_duplicate.unwrap_or_default();
        let library_duplicate = LibraryDuplicateSettings {
            hide_in_library_by_default: ld.hide_in_library_by_default.unwrap_or(true),
        };

        let lo = file.library_organize.unwrap_or_default();
        let library_organize = LibraryOrganizeSettings {
            prefer_album_folder: lo.prefer_album_folder.unwrap_or(true),
            exclude_terms: lo.exclude_terms.unwrap_or_default(),
        };

        let preview_file = file.preview.unwrap_or_default();
        let preview = PreviewSettings {
            enabled: preview_file.enabled.unwrap_or(true),
            cache_age_sec: preview_file.cache_age_sec.unwrap_or(3600),
        };

        let ui_file = file.ui.unwrap_or_default();
        let ui = UiSettings {
            page_size: ui_file.page_size.unwrap_or(50),
            theme: ui_file.theme.unwrap_or_else(|| "system".to_string()),
        };

        Ok(Self {
            db_dir,
            debug,
            mode,
            fetch_count,
            min_score,
            listenbrainz,
            slskd,
            catalog_discovery,
            library_duplicate,
            library_organize,
            preview,
            ui,
        })
    }

    pub fn store_db_path(&self) -> PathBuf {
        self.db_dir.join("discology.db")
    }
}

/// A custom `Debug` impl so logging or a boundary's "read back my
/// config" endpoint never leaks `listenbrainz.token` / `slskd.api_key`
/// / `catalog_discovery.similarity_api_key`.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("db_dir", &self.db_dir)
            .field("debug", &self.debug)
            .field("mode", &self.mode)
            .field("fetch_count", &self.fetch_count)
            .field("min_score", &self.min_score)
            .field("listenbrainz.base_url", &self.listenbrainz.base_url)
            .field("listenbrainz.user", &self.listenbrainz.user)
            .field("listenbrainz.token", &"<redacted>")
            .field("listenbrainz.auto_approve", &self.listenbrainz.auto_approve)
            .field("slskd.base_url", &self.slskd.base_url)
            .field("slskd.api_key", &redacted_if_present(&self.slskd.api_key))
            .field("catalog_discovery.enabled", &self.catalog_discovery.enabled)
            .field(
                "catalog_discovery.similarity_api_key",
                &redacted_if_present(&self.catalog_discovery.similarity_api_key),
            )
            .field("library_duplicate.hide_in_library_by_default", &self.library_duplicate.hide_in_library_by_default)
            .field("library_organize.prefer_album_folder", &self.library_organize.prefer_album_folder)
            .field("preview.enabled", &self.preview.enabled)
            .field("ui.theme", &self.ui.theme)
            .finish()
    }
}

fn redacted_if_present(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal_toml() -> &'static str {
        r#"
        [listenbrainz]
        user = "alice"
        token = "secret-token"

        [slskd]
        base_url = "http://localhost:5030"
        api_key = "secret-key"
        "#
    }

    #[test]
    fn resolve_applies_defaults_for_unset_fields() {
        let temp = TempDir::new().unwrap();
        let cli = CliConfig { db_dir: Some(temp.path().to_path_buf()), debug: false };
        let file: FileConfig = toml::from_str(minimal_toml()).unwrap();
        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        assert_eq!(config.fetch_count, 25);
        assert_eq!(config.mode, ContentMode::Album);
        assert_eq!(config.slskd.min_responses, 1);
        assert!(config.library_duplicate.hide_in_library_by_default);
    }

    #[test]
    fn debug_output_never_contains_secrets() {
        let temp = TempDir::new().unwrap();
        let cli = CliConfig { db_dir: Some(temp.path().to_path_buf()), debug: false };
        let file: FileConfig = toml::from_str(minimal_toml()).unwrap();
        let config = AppConfig::resolve(&cli, Some(file)).unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret-token"));
        assert!(!rendered.contains("secret-key"));
    }

    #[test]
    fn missing_db_dir_is_rejected() {
        let cli = CliConfig::default();
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("db_dir"));
    }

    #[test]
    fn nonexistent_db_dir_is_rejected() {
        let cli = CliConfig { db_dir: Some(PathBuf::from("/nonexistent/path/discology")), debug: false };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
