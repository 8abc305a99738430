//! # API Module
//!
//! HTTP handlers of the tunebridge server. Every handler receives the shared
//! [`AppState`] and delegates to the component that owns the behavior; the
//! handlers themselves only translate between HTTP and those components.
//!
//! ## Endpoints
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /health` | [`health`] |
//! | `GET /login`, `GET /callback`, `POST /refresh-token` | [`login`], [`callback`], [`refresh_token`] |
//! | `GET /api/spotify/{*path}` | [`spotify_proxy`] |
//! | `GET /api/deezer/{*path}`, including `by-name/<name>/<action>` | [`deezer_proxy`] |
//! | `POST /api/convert` | [`convert`] |
//! | `/api/local/...` | [`local`] |
//!
//! Errors are rendered by [`crate::error::ProxyError`] as
//! `{ "error": { "status", "message" } }`.

mod auth;
mod convert;
mod deezer;
mod health;
pub mod local;
mod spotify;

pub use auth::{callback, login, refresh_token};
pub use convert::convert;
pub use deezer::deezer_proxy;
pub use health::health;
pub use spotify::spotify_proxy;

use std::sync::Arc;

use crate::{
    cache::Cache,
    config::Config,
    convert::TrackConverter,
    credential::CredentialProvider,
    error::Result,
    management::LibraryManager,
    metadata::{MetadataClient, NameResolver},
    oauth::OAuthClient,
    proxy::ProxyRouter,
    scheduler::RequestScheduler,
    upstream::{UpstreamClient, http_client},
};

pub const HEADER_CACHE: &str = "x-cache";
pub const HEADER_TOKEN_TYPE: &str = "x-token-type";
pub const HEADER_CACHE_TTL: &str = "x-cache-ttl";
pub const HEADER_ARTIST_ID: &str = "x-deezer-artist-id";

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Everything the handlers share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Streaming API response cache.
    pub cache: Arc<Cache>,
    pub credentials: Arc<CredentialProvider>,
    pub proxy: Arc<ProxyRouter>,
    pub metadata: Arc<MetadataClient>,
    pub resolver: Arc<NameResolver>,
    pub converter: Arc<TrackConverter>,
    pub oauth: Arc<OAuthClient>,
    pub library: Arc<LibraryManager>,
}

impl AppState {
    /// Wires every component from `config`.
    ///
    /// The streaming and metadata APIs get separate HTTP clients and separate
    /// schedulers, so metadata traffic never delays streaming calls.
    ///
    /// Must be called inside a tokio runtime, the schedulers spawn their
    /// workers here.
    pub fn new(config: Config) -> Result<Self> {
        let spotify_http = http_client(USER_AGENT)?;
        let deezer_http = http_client(USER_AGENT)?;

        let spotify = UpstreamClient::new(
            spotify_http.clone(),
            RequestScheduler::new("spotify", config.scheduler.clone()),
        );
        let deezer = UpstreamClient::new(
            deezer_http,
            RequestScheduler::new("deezer", config.metadata_scheduler.clone()),
        );

        let cache = Arc::new(Cache::new());
        let credentials = Arc::new(CredentialProvider::new(spotify_http.clone(), &config));
        let proxy = Arc::new(ProxyRouter::new(
            &config,
            Arc::clone(&cache),
            Arc::clone(&credentials),
            spotify.clone(),
        ));

        let metadata = Arc::new(MetadataClient::new(
            &config.deezer_api_url,
            config.ttl.metadata,
            Arc::new(Cache::new()),
            deezer.clone(),
        ));
        let resolver = Arc::new(NameResolver::new(
            &config.deezer_api_url,
            config.ttl.name_resolution,
            Arc::new(Cache::new()),
            deezer,
        ));
        let converter = Arc::new(TrackConverter::new(
            &config.spotify_api_url,
            config.ttl.conversion,
            Arc::clone(&metadata),
            spotify,
        ));

        let oauth = Arc::new(OAuthClient::new(spotify_http, &config));
        let library = Arc::new(LibraryManager::new(config.library_path.clone()));

        Ok(Self {
            config: Arc::new(config),
            cache,
            credentials,
            proxy,
            metadata,
            resolver,
            converter,
            oauth,
            library,
        })
    }
}

/// Upstream-relative part of `path` once `prefix` is removed.
fn strip_route_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix)
        .unwrap_or(path)
        .trim_start_matches('/')
}
