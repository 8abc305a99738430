use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, Uri, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use tracing::error;

use super::{AppState, HEADER_CACHE, HEADER_CACHE_TTL, HEADER_TOKEN_TYPE, strip_route_prefix};
use crate::{error::Result, proxy::ProxyOutcome};

pub const ROUTE_PREFIX: &str = "/api/spotify";

/// `GET /api/spotify/<path>`: proxied to the streaming API.
///
/// The path is taken from the raw URI so encoded segments reach the upstream
/// untouched.
pub async fn spotify_proxy(
    State(state): State<AppState>,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response> {
    let path = strip_route_prefix(uri.path(), ROUTE_PREFIX);
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let outcome = state
        .proxy
        .handle(path, &query, auth)
        .await
        .inspect_err(|e| {
            error!(path, status = e.status().as_u16(), error = %e, "Proxy request failed")
        })?;

    Ok(respond(outcome))
}

fn respond(outcome: ProxyOutcome) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_CACHE, HeaderValue::from_static(outcome.cache.as_str()));
    headers.insert(
        HEADER_TOKEN_TYPE,
        HeaderValue::from_static(outcome.class.as_str()),
    );
    if let Some(ttl) = outcome.ttl {
        headers.insert(HEADER_CACHE_TTL, HeaderValue::from(ttl.as_millis() as u64));
    }

    match outcome.data {
        Some(data) => (StatusCode::OK, headers, Json(data)).into_response(),
        None => (StatusCode::NO_CONTENT, headers).into_response(),
    }
}
