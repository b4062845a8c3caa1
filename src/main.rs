use anyhow::Result;
use clap::Parser;
use discology::background_jobs::{create_scheduler, Clients, JobContext};
use discology::clients::{
    CoverArtClient, LibraryClient, MetadataClient, PeerSearchClient, RecommenderClient,
    RequestPacer, SimilarityClient,
};
use discology::config::{self, AppConfig, CliConfig};
use discology::download::file_filter::FileFilterConfig;
use discology::download::retry_policy::RetryPolicy;
use discology::download::scoring::ScoringConfig;
use discology::download::{DownloadEngine, EngineConfig, SelectionMode};
use discology::events::EventBus;
use discology::jobs::{
    AuditLogPruningConfig, AuditLogPruningJob, CatalogSimilarityConfig, CatalogSimilarityJob,
    DownloadDriverConfig, DownloadDriverJob, RecommenderFetchConfig, RecommenderFetchJob,
    StaleSelectionSweepConfig, StaleSelectionSweepJob,
};
use discology::persistence::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

/// Discovery-approval-acquisition scheduler: periodically pulls
/// recommendations, queues them for curation, and drives approved
/// wishlist items through peer search to a local download.
#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding the embedded store and downloaded files.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Enable debug-level logging regardless of LOG_LEVEL.
    #[clap(long)]
    pub debug: bool,
}

impl From<&CliArgs> for CliConfig {
    fn from(args: &CliArgs) -> Self {
        CliConfig { db_dir: args.db_dir.clone(), debug: args.debug }
    }
}

fn build_clients(config: &AppConfig) -> Result<Clients> {
    Ok(Clients {
        recommender: RecommenderClient::new(config.listenbrainz.base_url.clone()),
        library: LibraryClient::new(
            config.catalog_discovery.library_base_url.clone(),
            config.catalog_discovery.library_salt.clone(),
        ),
        similarity: SimilarityClient::new(
            config.catalog_discovery.similarity_base_url.clone(),
            config.catalog_discovery.similarity_api_key.clone(),
        ),
        metadata: MetadataClient::new(
            "https://musicbrainz.org/ws/2".to_string(),
            format!("discology/{} ( https://github.com/ )", env!("CARGO_PKG_VERSION")),
        )?,
        coverart: CoverArtClient::new("https://coverartarchive.org".to_string()),
        peer_search: PeerSearchClient::new(config.slskd.base_url.clone(), config.slskd.api_key.clone()),
        similarity_pacer: RequestPacer::new(Duration::from_secs(1)),
    })
}

fn build_engine_config(config: &AppConfig) -> EngineConfig {
    EngineConfig {
        selection_mode: SelectionMode::Manual,
        selection_timeout_hours: config.slskd.selection_timeout_hours,
        search_timeout_ms: config.slskd.search_timeout_ms,
        min_responses: config.slskd.min_responses,
        simplify_on_retry: true,
        exclude_terms: config.library_organize.exclude_terms.clone(),
        scoring: ScoringConfig::default(),
        file_filter: FileFilterConfig { min_file_size_mb: 1.0, max_file_size_mb: 500.0, directory: None },
        retry_policy: RetryPolicy::default(),
        downloads_root: config.slskd.downloads_root.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(if cli_args.debug { LevelFilter::DEBUG } else { LevelFilter::INFO }.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .ok();

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    let cli_config: CliConfig = (&cli_args).into();
    let app_config = AppConfig::resolve(&cli_config, file_config)?;
    info!(config = ?app_config, "configuration resolved");

    std::fs::create_dir_all(&app_config.slskd.downloads_root)?;

    let store = Arc::new(Store::open(app_config.store_db_path())?);
    let events = Arc::new(EventBus::new());
    let clients = Arc::new(build_clients(&app_config)?);
    let engine = Arc::new(DownloadEngine::new(
        store.clone(),
        events.clone(),
        clients.peer_search.clone(),
        build_engine_config(&app_config),
    ));

    let shutdown_token = CancellationToken::new();
    let (_hook_sender, hook_receiver) = tokio::sync::mpsc::channel(100);

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        store.clone(),
        clients.clone(),
        events.clone(),
        engine.clone(),
    );

    let (mut scheduler, scheduler_handle) =
        create_scheduler(store.clone(), hook_receiver, shutdown_token.clone(), job_context);

    scheduler
        .register_job(Arc::new(RecommenderFetchJob::new(RecommenderFetchConfig {
            listenbrainz_user: app_config.listenbrainz.user.clone(),
            listenbrainz_token: app_config.listenbrainz.token.clone(),
            fetch_count: app_config.fetch_count,
            min_score: app_config.min_score,
            auto_approve: app_config.listenbrainz.auto_approve,
            mode: app_config.mode,
            interval: app_config.listenbrainz.interval,
        })))
        .await;

    if app_config.catalog_discovery.enabled {
        scheduler
            .register_job(Arc::new(CatalogSimilarityJob::new(CatalogSimilarityConfig {
                similar_per_artist: app_config.catalog_discovery.similar_per_artist,
                albums_per_artist: app_config.catalog_discovery.albums_per_artist,
                max_artists_per_run: app_config.catalog_discovery.max_artists_per_run,
                min_similarity: app_config.catalog_discovery.min_similarity,
                interval: app_config.catalog_discovery.interval,
            })))
            .await;
    }

    scheduler
        .register_job(Arc::new(DownloadDriverJob::new(DownloadDriverConfig { interval: Duration::from_secs(10) })))
        .await;

    scheduler
        .register_job(Arc::new(StaleSelectionSweepJob::new(StaleSelectionSweepConfig {
            interval: Duration::from_secs(60),
        })))
        .await;

    scheduler
        .register_job(Arc::new(AuditLogPruningJob::new(AuditLogPruningConfig {
            retention_secs: 90 * 24 * 60 * 60,
            interval: Duration::from_secs(24 * 60 * 60),
        })))
        .await;

    info!("job scheduler initialized with {} job(s)", scheduler.job_count().await);
    let _ = scheduler_handle;

    info!("discology is running; press Ctrl+C to stop");

    tokio::select! {
        _ = scheduler.run() => {
            info!("scheduler stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    }

    Ok(())
}
