//! Free public metadata API (Deezer).
//!
//! Needs no credential. Calls go through their own scheduler so they never
//! take spacing slots from the streaming API. Successful bodies are cached
//! for the metadata TTL, keyed by path and query.
//!
//! The API reports many failures as `200` with an `error` object in the body;
//! those are turned into errors here and never cached.

mod resolver;

pub use resolver::NameResolver;

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    cache::Cache,
    error::{ProxyError, Result},
    proxy::CacheStatus,
    upstream::{UpstreamClient, build_url},
};

/// Error code the API uses for "no such object".
const DATA_NOT_FOUND_CODE: u64 = 800;

/// Response of the resolve-by-name entry point.
#[derive(Debug, Clone)]
pub struct ByNameOutcome {
    pub artist_id: u64,
    pub data: Value,
    pub cache: CacheStatus,
}

pub struct MetadataClient {
    api_base: String,
    ttl: Duration,
    cache: Arc<Cache>,
    upstream: UpstreamClient,
}

impl MetadataClient {
    pub fn new(api_base: &str, ttl: Duration, cache: Arc<Cache>, upstream: UpstreamClient) -> Self {
        Self {
            api_base: api_base.to_string(),
            ttl,
            cache,
            upstream,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Fetches `<api>/<path>?<query>`, from cache when possible.
    pub async fn get(&self, path: &str, query: &[(String, String)]) -> Result<(Value, CacheStatus)> {
        let url = build_url(&self.api_base, path, query)?;
        let key = url.as_str().to_string();

        if let Some(data) = self.cache.get(&key) {
            debug!(path, "Metadata cache hit");
            return Ok((data, CacheStatus::Hit));
        }

        let data = self
            .upstream
            .call(url.as_str(), None)
            .await?
            .unwrap_or(Value::Null);
        check_error_object(path, &data)?;

        self.cache.set(key, data.clone(), self.ttl);
        Ok((data, CacheStatus::Miss))
    }

    /// Resolves `name` to an artist id, then fetches `artist/<id>/<action>`.
    pub async fn by_name(
        &self,
        resolver: &NameResolver,
        name: &str,
        action: &str,
    ) -> Result<ByNameOutcome> {
        let action = action.trim_matches('/');
        if name.trim().is_empty() || action.is_empty() {
            return Err(ProxyError::bad_request(
                "Expected by-name/<artist name>/<action>",
            ));
        }

        let artist_id = resolver.resolve_artist_id(name).await?;
        debug!(name, artist_id, action, "Resolved artist by name");

        let query = vec![("limit".to_string(), "20".to_string())];
        let (data, cache) = self
            .get(&format!("artist/{artist_id}/{action}"), &query)
            .await?;

        Ok(ByNameOutcome {
            artist_id,
            data,
            cache,
        })
    }
}

fn check_error_object(path: &str, data: &Value) -> Result<()> {
    let Some(error) = data.get("error") else {
        return Ok(());
    };

    if error.get("code").and_then(Value::as_u64) == Some(DATA_NOT_FOUND_CODE) {
        return Err(ProxyError::not_found(path.to_string()));
    }

    warn!(path, error = %error, "Metadata API returned an error object");
    Err(ProxyError::upstream(
        502,
        format!("Deezer error: {error}"),
    ))
}
