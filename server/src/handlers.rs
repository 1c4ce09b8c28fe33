use crate::limiter::{request_identity, KeyParam};
use crate::{ApiError, AppState};
use axum::{
    extract::{ConnectInfo, Query, State},
    http::HeaderMap,
    Json,
};
use fragment_core::index::DEFAULT_LIMIT;
use fragment_core::{Fragment, FragmentId, Metadata};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Deserialize)]
pub struct FragmentParams {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub limit: Option<String>,
}

impl SearchParams {
    /// Non-numeric or non-positive limits fall back to the default.
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .map_or(DEFAULT_LIMIT, |l| usize::try_from(l).unwrap_or(usize::MAX))
    }
}

#[derive(Serialize)]
pub struct Quote {
    pub id: FragmentId,
    pub text: String,
    pub title: String,
    pub url: String,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub version: &'static str,
    pub fragment_count: usize,
    pub total_requests: u64,
    pub your_requests: u32,
    pub remaining_limit: u32,
    pub is_donor: bool,
}

pub async fn root(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.admission.config();
    Json(serde_json::json!({
        "name": "Fragment Archive API",
        "version": API_VERSION,
        "description": "Retrieve archive fragments by id, at random, or by full-text search",
        "endpoints": ["/fragment?id=123", "/random", "/search?q=term", "/info", "/quote", "/status"],
        "usage_limits": {
            "free_tier": format!("{} requests per {} seconds", config.limit, config.window_secs()),
            "unlimited": "Available for supporters with a donor key",
            "support_link": state.settings.donate_url,
        },
    }))
}

pub async fn fragment(State(state): State<AppState>, Query(params): Query<FragmentParams>) -> Result<Json<Fragment>, ApiError> {
    let raw = params.id.filter(|s| !s.is_empty()).ok_or(ApiError::BadRequest("Missing id parameter"))?;
    let id: FragmentId = raw.trim().parse().map_err(|_| ApiError::BadRequest("Invalid id parameter"))?;
    let fragment = state.corpus().lookup_by_id(id)?;
    Ok(Json(fragment.clone()))
}

pub async fn random(State(state): State<AppState>) -> Result<Json<Fragment>, ApiError> {
    let fragment = state.corpus().random(&mut rand::thread_rng())?;
    Ok(Json(fragment.clone()))
}

pub async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Result<Json<Vec<Fragment>>, ApiError> {
    let query = params.q.as_deref().map(str::trim).filter(|q| !q.is_empty()).ok_or(ApiError::BadRequest("Missing search query"))?;
    let limit = params.limit();
    let results: Vec<Fragment> = state.index.search(query, limit).into_iter().cloned().collect();
    tracing::debug!(query, limit, hits = results.len(), "search");
    Ok(Json(results))
}

pub async fn info(State(state): State<AppState>) -> Json<Metadata> {
    Json(state.metadata.as_ref().clone())
}

pub async fn quote(State(state): State<AppState>) -> Result<Json<Quote>, ApiError> {
    let f = state.corpus().random_quote(&mut rand::thread_rng())?;
    Ok(Json(Quote { id: f.id, text: f.text.clone(), title: f.title.clone(), url: f.url.clone() }))
}

pub async fn status(
    State(state): State<AppState>,
    Query(key): Query<KeyParam>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    let identity = request_identity(&headers, peer.map(|c| c.0));
    let usage = state.admission.usage(&identity);
    let uptime = state.started_at.elapsed();
    Json(StatusResponse {
        status: "operational",
        uptime: format_uptime(uptime),
        uptime_seconds: uptime.as_secs(),
        version: API_VERSION,
        fragment_count: state.corpus().len(),
        total_requests: state.total_requests.load(Ordering::Relaxed),
        your_requests: usage.requests,
        remaining_limit: usage.remaining,
        is_donor: state.admission.is_donor(key.key.as_deref()),
    })
}

/// Render a duration as `1h2m3s`, omitting leading zero units.
pub fn format_uptime(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}
