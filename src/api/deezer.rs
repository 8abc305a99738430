use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue},
};
use tracing::error;

use super::{AppState, HEADER_ARTIST_ID, HEADER_CACHE};
use crate::error::Result;

const BY_NAME_PREFIX: &str = "by-name/";

/// `GET /api/deezer/<path>`: cached passthrough to the metadata API.
///
/// `by-name/<name>/<action>` resolves the artist name first and answers with
/// the resolved id in `X-Deezer-Artist-ID`.
pub async fn deezer_proxy(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<(HeaderMap, Json<serde_json::Value>)> {
    if let Some(rest) = path.strip_prefix(BY_NAME_PREFIX) {
        let (name, action) = rest.split_once('/').unwrap_or((rest, ""));
        return by_name(&state, name, action).await;
    }

    let (data, cache) = state
        .metadata
        .get(&path, &query)
        .await
        .inspect_err(|e| error!(path = %path, error = %e, "Metadata request failed"))?;

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_CACHE, HeaderValue::from_static(cache.as_str()));
    Ok((headers, Json(data)))
}

async fn by_name(
    state: &AppState,
    name: &str,
    action: &str,
) -> Result<(HeaderMap, Json<serde_json::Value>)> {
    let outcome = state
        .metadata
        .by_name(&state.resolver, name, action)
        .await
        .inspect_err(|e| error!(name, action, error = %e, "Lookup by name failed"))?;

    let mut headers = HeaderMap::new();
    headers.insert(HEADER_CACHE, HeaderValue::from_static(outcome.cache.as_str()));
    headers.insert(HEADER_ARTIST_ID, HeaderValue::from(outcome.artist_id));
    Ok((headers, Json(outcome.data)))
}
