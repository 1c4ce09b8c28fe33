use crate::AppState;
use axum::{
    extract::{ConnectInfo, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use fragment_core::{client_identity, Decision, Rejection};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;

#[derive(Debug, Default, Deserialize)]
pub struct KeyParam {
    pub key: Option<String>,
}

/// Identity of the caller: forwarded address or peer IP plus user agent.
///
/// The peer port is left out so reconnecting clients keep their identity.
pub fn request_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok());
    let user_agent = headers.get(header::USER_AGENT).map(|v| String::from_utf8_lossy(v.as_bytes()));
    let peer = peer.map(|p| p.ip().to_string());
    client_identity(forwarded, peer.as_deref(), user_agent.as_deref())
}

pub async fn count_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.total_requests.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// Admission middleware. Preflight requests and donor keys pass straight
/// through; everyone else is counted against their window.
pub async fn admission(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let key = Query::<KeyParam>::try_from_uri(req.uri()).map(|q| q.0.key).unwrap_or_default();
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);
    let identity = request_identity(req.headers(), peer);
    tracing::debug!(client = %identity, path = %req.uri().path(), "admission check");

    match state.admission.check(&identity, key.as_deref()) {
        Decision::Rejected(rejection) => rejection_response(&rejection, &state.settings.donate_url),
        Decision::Donor | Decision::Admitted { .. } => next.run(req).await,
    }
}

pub fn rejection_response(rejection: &Rejection, donate_url: &str) -> Response {
    let body = serde_json::json!({
        "error": "Rate limit exceeded",
        "message": "You've reached the free usage limit. Consider supporting this project to get unlimited access.",
        "donate_url": donate_url,
        "retry_after_seconds": rejection.retry_after_secs,
        "current_count": rejection.current_count,
        "limit": rejection.limit,
    });
    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response.headers_mut().insert(header::RETRY_AFTER, HeaderValue::from(rejection.retry_after_secs));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_uses_forwarded_header_first() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("test-agent"));
        let peer: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(request_identity(&headers, Some(peer)), "203.0.113.9|test-agent");
        assert_eq!(request_identity(&HeaderMap::new(), Some(peer)), "127.0.0.1|");
    }

    #[test]
    fn identity_ignores_peer_port() {
        let a: SocketAddr = "192.0.2.7:50001".parse().unwrap();
        let b: SocketAddr = "192.0.2.7:50002".parse().unwrap();
        assert_eq!(request_identity(&HeaderMap::new(), Some(a)), request_identity(&HeaderMap::new(), Some(b)));
    }

    #[test]
    fn non_ascii_user_agents_stay_distinct() {
        let with_agent = |bytes: &'static [u8]| {
            let mut headers = HeaderMap::new();
            headers.insert(header::USER_AGENT, HeaderValue::from_bytes(bytes).unwrap());
            request_identity(&headers, None)
        };
        let first = with_agent(b"navegador-\xe9");
        let second = with_agent(b"browser-\xff");
        assert_ne!(first, second);
        assert!(first.starts_with("|navegador-"));
    }

    #[test]
    fn rejection_carries_retry_after() {
        let resp = rejection_response(&Rejection { retry_after_secs: 60, current_count: 2, limit: 2 }, "https://example.org");
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "60");
    }
}
