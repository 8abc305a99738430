//! Proxy for the streaming API.
//!
//! Each inbound request is routed by the first segment of its upstream path:
//!
//! | first segment | credential |
//! |---|---|
//! | `me` | rejected, the caller must hit the API directly |
//! | `playlists`, `shows`, `episodes`, `browse` | caller's bearer token, required |
//! | anything else | shared client credential, default market injected |
//!
//! The shared credential is rate-limited per endpoint family, and editorial
//! playlist endpoints can lock it out for hours, so the protected family never
//! falls back to it.
//!
//! Responses are cached under `{user|client}::{url}` with the TTL of their
//! resource class.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    cache::{Cache, TtlPolicy, cache_key},
    config::Config,
    credential::CredentialProvider,
    error::{ProxyError, Result},
    upstream::{UpstreamClient, build_url},
    utils,
};

pub const MARKET_PARAM: &str = "market";
/// Market value asking the API to derive the region from the token.
pub const MARKET_FROM_TOKEN: &str = "from_token";

/// Which credential a request is sent with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialClass {
    /// Token forwarded by the caller.
    User,
    /// Shared application token.
    Client,
}

impl CredentialClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialClass::User => "user",
            CredentialClass::Client => "client",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Caller's own data; must bypass the proxy.
    SelfScoped,
    Protected,
    Public,
}

/// First-segment rules, checked in order. Unmatched paths are public.
const ROUTE_RULES: &[(&str, Route)] = &[
    ("me", Route::SelfScoped),
    ("playlists", Route::Protected),
    ("shows", Route::Protected),
    ("episodes", Route::Protected),
    ("browse", Route::Protected),
];

/// Routes an upstream-relative path such as `artists/123/albums`.
pub fn route_for(path: &str) -> Route {
    let first = first_segment(path);
    ROUTE_RULES
        .iter()
        .find(|(segment, _)| *segment == first)
        .map(|(_, route)| *route)
        .unwrap_or(Route::Public)
}

fn first_segment(path: &str) -> &str {
    path.trim_start_matches('/').split('/').next().unwrap_or_default()
}

/// Returns `path` without its leading slashes if the URL parser will keep it
/// as written.
///
/// Dot segments, plain or percent-encoded, and backslashes would be resolved
/// by [`build_url`] after routing, so they are refused. The first segment
/// decides the route and must be a plain word.
///
/// # Errors
///
/// [`ProxyError::BadRequest`] when the path would be rewritten.
pub fn checked_path(path: &str) -> Result<&str> {
    let path = path.trim_start_matches('/');

    if path.contains('\\') || path.split('/').any(is_dot_segment) {
        return Err(ProxyError::bad_request("Path must not contain dot segments"));
    }

    let first = first_segment(path);
    let plain = first
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if first.is_empty() || !plain {
        return Err(ProxyError::bad_request(format!(
            "Unsupported resource segment '{first}'"
        )));
    }

    Ok(path)
}

fn is_dot_segment(segment: &str) -> bool {
    let decoded = segment.to_ascii_lowercase().replace("%2e", ".");
    decoded == "." || decoded == ".."
}

/// Sets `market` to `default` when it is missing or asks for the token's
/// region. An existing entry keeps its position; duplicates are dropped.
pub fn apply_default_market(query: &mut Vec<(String, String)>, default: &str) {
    let position = query.iter().position(|(k, _)| k == MARKET_PARAM);
    if position.is_some_and(|i| query[i].1 != MARKET_FROM_TOKEN) {
        return;
    }

    query.retain(|(k, _)| k != MARKET_PARAM);
    let entry = (MARKET_PARAM.to_string(), default.to_string());
    match position {
        Some(i) => query.insert(i, entry),
        None => query.push(entry),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// A proxied response and how it was produced.
#[derive(Debug, Clone)]
pub struct ProxyOutcome {
    /// `None` when the upstream answered `204 No Content`.
    pub data: Option<Value>,
    pub cache: CacheStatus,
    pub class: CredentialClass,
    /// Set when the response was freshly stored.
    pub ttl: Option<Duration>,
}

pub struct ProxyRouter {
    api_base: String,
    default_market: String,
    ttl: TtlPolicy,
    cache: Arc<Cache>,
    credentials: Arc<CredentialProvider>,
    upstream: UpstreamClient,
}

impl ProxyRouter {
    pub fn new(
        config: &Config,
        cache: Arc<Cache>,
        credentials: Arc<CredentialProvider>,
        upstream: UpstreamClient,
    ) -> Self {
        Self {
            api_base: config.spotify_api_url.clone(),
            default_market: config.default_market.clone(),
            ttl: config.ttl.clone(),
            cache,
            credentials,
            upstream,
        }
    }

    /// Proxies `GET <api>/<path>?<query>`.
    ///
    /// `auth_header` is the raw inbound `Authorization` value, if any.
    ///
    /// # Errors
    ///
    /// - [`ProxyError::BadRequest`] for a path the URL parser would rewrite
    /// - [`ProxyError::SelfScopedPath`] for the `me` family
    /// - [`ProxyError::MissingUserCredential`] for a protected path without a
    ///   bearer token
    /// - credential, throttling and upstream errors otherwise
    ///
    /// The first three fail before any network activity.
    pub async fn handle(
        &self,
        path: &str,
        query: &[(String, String)],
        auth_header: Option<&str>,
    ) -> Result<ProxyOutcome> {
        let path =
            checked_path(path).inspect_err(|e| warn!(path, error = %e, "Rejected path"))?;
        let mut query = query.to_vec();

        let (class, user_token) = match route_for(path) {
            Route::SelfScoped => {
                warn!(path, "Rejected self-scoped path");
                return Err(ProxyError::SelfScopedPath {
                    path: format!("{}/*", first_segment(path)),
                });
            }
            Route::Protected => {
                let token = auth_header.and_then(utils::bearer_token).ok_or_else(|| {
                    warn!(path, "Protected path requested without a user token");
                    ProxyError::MissingUserCredential {
                        resource: first_segment(path).to_string(),
                    }
                })?;
                (CredentialClass::User, Some(token.to_string()))
            }
            Route::Public => {
                apply_default_market(&mut query, &self.default_market);
                (CredentialClass::Client, None)
            }
        };

        let url = build_url(&self.api_base, path, &query)?;
        let key = cache_key(class, url.as_str());

        if let Some(data) = self.cache.get(&key) {
            debug!(path, class = class.as_str(), "Cache hit");
            return Ok(ProxyOutcome {
                data: Some(data),
                cache: CacheStatus::Hit,
                class,
                ttl: None,
            });
        }

        let token = match user_token {
            Some(token) => token,
            None => self.credentials.get_credential().await?.value,
        };

        let data = self.upstream.call(url.as_str(), Some(&token)).await?;

        let ttl = match &data {
            Some(value) => {
                let ttl = self.ttl.for_path(path);
                self.cache.set(key, value.clone(), ttl);
                info!(
                    path,
                    class = class.as_str(),
                    ttl_ms = ttl.as_millis() as u64,
                    "Cached upstream response"
                );
                Some(ttl)
            }
            None => None,
        };

        Ok(ProxyOutcome {
            data,
            cache: CacheStatus::Miss,
            class,
            ttl,
        })
    }
}
