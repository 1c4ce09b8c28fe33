use anyhow::Result;
use axum::{middleware, routing::{get, post}, Router};
use fragment_core::corpus::{load_fragments, load_metadata};
use fragment_core::{AdmissionController, Corpus, DonorKeys, InvertedIndex, Metadata, RateLimitConfig};
use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod limiter;
pub mod webhook;

pub use error::ApiError;

pub const FRAGMENTS_FILE: &str = "all_fragments.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const DEFAULT_DONATE_URL: &str = "https://ko-fi.com/bxav";

/// Everything the server needs besides the corpus itself.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the fragments and metadata files.
    pub data_dir: PathBuf,
    pub rate_limit: RateLimitConfig,
    /// Comma separated donor keys.
    pub donor_keys: String,
    pub kofi_token: Option<String>,
    pub api_key_salt: Option<String>,
    /// Comma separated allowed origins; any origin when unset.
    pub cors_allow_origin: Option<String>,
    pub donate_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            rate_limit: RateLimitConfig::default(),
            donor_keys: String::new(),
            kofi_token: None,
            api_key_salt: None,
            cors_allow_origin: None,
            donate_url: DEFAULT_DONATE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub kofi_token: Option<String>,
    pub api_key_salt: String,
    pub donate_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<InvertedIndex>,
    pub metadata: Arc<Metadata>,
    pub admission: Arc<AdmissionController>,
    pub settings: Arc<Settings>,
    pub started_at: Instant,
    pub total_requests: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(corpus: Corpus, metadata: Metadata, config: &ServerConfig) -> Self {
        let index = InvertedIndex::build(Arc::new(corpus));
        let admission = AdmissionController::new(config.rate_limit, DonorKeys::parse(&config.donor_keys));
        let api_key_salt = config.api_key_salt.clone().unwrap_or_else(|| {
            tracing::warn!("API_KEY_SALT not set, using a per-process random salt");
            webhook::random_salt()
        });
        Self {
            index: Arc::new(index),
            metadata: Arc::new(metadata),
            admission: Arc::new(admission),
            settings: Arc::new(Settings { kofi_token: config.kofi_token.clone(), api_key_salt, donate_url: config.donate_url.clone() }),
            started_at: Instant::now(),
            total_requests: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn corpus(&self) -> &Corpus { self.index.corpus() }
}

/// Load the corpus from `config.data_dir` and build the router.
pub fn build_app(config: &ServerConfig) -> Result<Router> {
    let corpus = load_fragments(config.data_dir.join(FRAGMENTS_FILE))?;
    let metadata_path = config.data_dir.join(METADATA_FILE);
    let metadata = if metadata_path.exists() {
        load_metadata(&metadata_path)?
    } else {
        tracing::warn!(path = %metadata_path.display(), "metadata file missing, serving defaults");
        Metadata { fragments_count: corpus.len(), ..Metadata::default() }
    };
    let state = AppState::new(corpus, metadata, config);
    spawn_idle_sweeper(&state);
    Ok(router(state, config.cors_allow_origin.as_deref()))
}

pub fn router(state: AppState, cors_allow_origin: Option<&str>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(|| async { "ok" }))
        .route("/fragment", get(handlers::fragment))
        .route("/random", get(handlers::random))
        .route("/search", get(handlers::search))
        .route("/info", get(handlers::info))
        .route("/quote", get(handlers::quote))
        .route("/status", get(handlers::status))
        .route("/webhook/kofi", post(webhook::kofi))
        .layer(middleware::from_fn_with_state(state.clone(), limiter::admission))
        .layer(middleware::from_fn_with_state(state.clone(), limiter::count_requests))
        .with_state(state)
        .layer(cors_layer(cors_allow_origin))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origins: Vec<_> = allow_origin
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();
    if origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
    }
}

/// Periodically evict idle client records. Does nothing when eviction is
/// disabled or no tokio runtime is running.
pub fn spawn_idle_sweeper(state: &AppState) -> Option<tokio::task::JoinHandle<()>> {
    state.admission.config().max_idle()?;
    let handle = tokio::runtime::Handle::try_current().ok()?;
    let admission = Arc::clone(&state.admission);
    let period = admission.config().window.max(Duration::from_secs(1));
    Some(handle.spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            admission.sweep();
        }
    }))
}
