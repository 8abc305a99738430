use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    cache::Cache,
    error::{ProxyError, Result},
    upstream::{UpstreamClient, build_url},
};

/// Maps free-text artist names to metadata API ids.
///
/// Name to id associations are assumed stable, so a resolved id is cached
/// under the lowercased name. A name that yields no result is not cached.
pub struct NameResolver {
    api_base: String,
    ttl: Duration,
    cache: Arc<Cache>,
    upstream: UpstreamClient,
}

impl NameResolver {
    pub fn new(api_base: &str, ttl: Duration, cache: Arc<Cache>, upstream: UpstreamClient) -> Self {
        Self {
            api_base: api_base.to_string(),
            ttl,
            cache,
            upstream,
        }
    }

    /// # Errors
    ///
    /// [`ProxyError::NotFound`] when the artist search yields no result.
    pub async fn resolve_artist_id(&self, name: &str) -> Result<u64> {
        let key = name.to_lowercase();
        if let Some(id) = self.cache.get(&key).as_ref().and_then(Value::as_u64) {
            debug!(name, id, "Artist id from cache");
            return Ok(id);
        }

        let query = vec![
            ("q".to_string(), name.to_string()),
            ("limit".to_string(), "1".to_string()),
        ];
        let url = build_url(&self.api_base, "search/artist", &query)?;
        let data = self.upstream.call(url.as_str(), None).await?;

        let id = data
            .as_ref()
            .and_then(|d| d.pointer("/data/0/id"))
            .and_then(Value::as_u64)
            .ok_or_else(|| ProxyError::not_found(format!("Artist \"{name}\"")))?;

        info!(name, id, "Resolved artist name");
        self.cache.set(key, Value::from(id), self.ttl);
        Ok(id)
    }
}
