//! Maps a metadata API track to a streaming API track URI.
//!
//! The lookup first tries an exact ISRC search, then a title/artist search
//! that keeps the candidate whose duration is closest to the source track.
//! The outcome is cached per track id, including "no match": a cached `null`
//! is a negative entry and short-circuits later lookups for the same track
//! until it expires. A lookup where a search failed is never cached.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    cache::Cache,
    error::{ProxyError, Result},
    metadata::MetadataClient,
    upstream::{UpstreamClient, build_url},
};

/// Largest duration gap, in seconds, accepted for a fuzzy match.
const MAX_DURATION_GAP_SECS: f64 = 10.0;
const FUZZY_CANDIDATES: &str = "5";

pub struct TrackConverter {
    api_base: String,
    ttl: Duration,
    cache: Cache,
    metadata: Arc<MetadataClient>,
    upstream: UpstreamClient,
}

impl TrackConverter {
    pub fn new(
        api_base: &str,
        ttl: Duration,
        metadata: Arc<MetadataClient>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            api_base: api_base.to_string(),
            ttl,
            cache: Cache::new(),
            metadata,
            upstream,
        }
    }

    /// Returns the streaming URI for metadata track `track_id`, or `None` when
    /// no candidate matched.
    ///
    /// # Errors
    ///
    /// [`ProxyError::NotFound`] when the source track does not exist. A failed
    /// search is returned as its error unless the other search still found a
    /// match.
    pub async fn convert(&self, track_id: &str, user_token: &str) -> Result<Option<String>> {
        if let Some(cached) = self.cache.get(track_id) {
            info!(track_id, uri = ?cached.as_str(), "Conversion cache hit");
            return Ok(cached.as_str().map(str::to_owned));
        }

        let (track, _) = self
            .metadata
            .get(&format!("track/{track_id}"), &[])
            .await
            .map_err(|e| match e {
                ProxyError::NotFound(_) => ProxyError::not_found("Deezer track"),
                other => other,
            })?;

        let mut failure = None;

        let mut uri = None;
        if let Some(isrc) = track.get("isrc").and_then(Value::as_str) {
            match self.search_isrc(isrc, user_token).await {
                Ok(found) => uri = found,
                Err(e) => failure = Some(e),
            }
        }
        if uri.is_none() {
            match self.search_fuzzy(&track, user_token).await {
                Ok(found) => uri = found,
                Err(e) => failure = Some(e),
            }
        }

        match (uri, failure) {
            (Some(uri), _) => {
                self.cache.set(track_id, Value::String(uri.clone()), self.ttl);
                Ok(Some(uri))
            }
            (None, Some(e)) => Err(e),
            (None, None) => {
                self.cache.set(track_id, Value::Null, self.ttl);
                Ok(None)
            }
        }
    }

    async fn search_isrc(&self, isrc: &str, user_token: &str) -> Result<Option<String>> {
        let items = self
            .search(&format!("isrc:{isrc}"), "1", user_token)
            .await?;
        let uri = items
            .first()
            .and_then(|t| t.get("uri"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        if let Some(uri) = &uri {
            info!(isrc, uri = %uri, "ISRC match");
        }
        Ok(uri)
    }

    async fn search_fuzzy(&self, track: &Value, user_token: &str) -> Result<Option<String>> {
        let (Some(title), Some(artist)) = (
            track.get("title").and_then(Value::as_str),
            track.pointer("/artist/name").and_then(Value::as_str),
        ) else {
            return Ok(None);
        };
        let duration = track.get("duration").and_then(Value::as_f64).unwrap_or(0.0);

        info!(title, artist, "Falling back to fuzzy search");
        let items = self
            .search(
                &format!("track:{title} artist:{artist}"),
                FUZZY_CANDIDATES,
                user_token,
            )
            .await?;

        let uri = best_duration_match(&items, duration);
        if let Some(uri) = &uri {
            info!(title, uri = %uri, "Fuzzy match");
        }
        Ok(uri)
    }

    /// Track items of a search, empty when the response has none.
    async fn search(&self, q: &str, limit: &str, user_token: &str) -> Result<Vec<Value>> {
        let query = vec![
            ("q".to_string(), q.to_string()),
            ("type".to_string(), "track".to_string()),
            ("limit".to_string(), limit.to_string()),
        ];
        let url = build_url(&self.api_base, "search", &query)?;

        let data = self
            .upstream
            .call(url.as_str(), Some(user_token))
            .await
            .inspect_err(|e| warn!(q, error = %e, "Track search failed"))?;

        Ok(data
            .as_ref()
            .and_then(|d| d.pointer("/tracks/items"))
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

/// URI of the candidate whose `duration_ms` is closest to `duration_secs`,
/// if that gap is under ten seconds.
pub fn best_duration_match(items: &[Value], duration_secs: f64) -> Option<String> {
    let gap = |item: &Value| {
        let ms = item.get("duration_ms").and_then(Value::as_f64).unwrap_or(0.0);
        (ms / 1000.0 - duration_secs).abs()
    };

    items
        .iter()
        .min_by(|a, b| gap(a).total_cmp(&gap(b)))
        .filter(|best| gap(best) < MAX_DURATION_GAP_SECS)
        .and_then(|best| best.get("uri"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}
