//! Configuration management for tunebridge.
//!
//! Values come from environment variables, optionally seeded from a `.env`
//! file in the local data directory. The rest of the crate never reads the
//! environment directly: [`Config::from_env`] is called once at startup and the
//! resulting struct is handed to every component.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    cache::TtlPolicy,
    error::{ProxyError, Result},
    scheduler::SchedulerPolicy,
};

const APP_DIR: &str = "tunebridge";

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3001";
const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3001/callback";
const DEFAULT_FRONTEND_URL: &str = "http://127.0.0.1:5173";
const DEFAULT_DEEZER_API_URL: &str = "https://api.deezer.com";
const DEFAULT_MARKET: &str = "FR";
const DEFAULT_SCOPE: &str = "user-read-private user-read-email user-modify-playback-state \
    user-read-playback-state user-read-currently-playing streaming user-library-modify \
    user-library-read user-follow-read user-top-read user-read-recently-played \
    playlist-read-private playlist-read-collaborative playlist-modify-public \
    playlist-modify-private";

/// Loads environment variables from a `.env` file in the local data directory.
///
/// The file lives at `<data_local_dir>/tunebridge/.env`:
/// - Linux: `~/.local/share/tunebridge/.env`
/// - macOS: `~/Library/Application Support/tunebridge/.env`
/// - Windows: `%LOCALAPPDATA%/tunebridge/.env`
///
/// A missing file is not an error, the process environment alone may carry
/// everything. A file that exists but cannot be parsed is.
pub async fn load_env() -> Result<()> {
    let path = data_dir().join(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    if path.is_file() {
        dotenv::from_path(&path)
            .map_err(|e| ProxyError::config(format!("{}: {}", path.display(), e)))?;
    }
    Ok(())
}

/// Platform-specific data directory of the application.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to, e.g. `127.0.0.1:3001`.
    pub server_address: String,
    pub client_id: String,
    pub client_secret: String,
    /// Base of the streaming API, e.g. `https://api.spotify.com/v1`.
    pub spotify_api_url: String,
    pub spotify_token_url: String,
    pub spotify_auth_url: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Where the browser is sent after the login callback.
    pub frontend_url: String,
    pub deezer_api_url: String,
    /// Region injected into client-credential requests.
    pub default_market: String,
    /// Remaining validity below which the client credential is refreshed.
    pub refresh_margin: Duration,
    pub scheduler: SchedulerPolicy,
    /// Spacing for the metadata API queue.
    pub metadata_scheduler: SchedulerPolicy,
    pub ttl: TtlPolicy,
    pub library_path: PathBuf,
}

impl Config {
    /// Builds a configuration with every optional value at its default.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            spotify_api_url: DEFAULT_SPOTIFY_API_URL.to_string(),
            spotify_token_url: DEFAULT_SPOTIFY_TOKEN_URL.to_string(),
            spotify_auth_url: DEFAULT_SPOTIFY_AUTH_URL.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            deezer_api_url: DEFAULT_DEEZER_API_URL.to_string(),
            default_market: DEFAULT_MARKET.to_string(),
            refresh_margin: Duration::from_secs(60),
            scheduler: SchedulerPolicy::default(),
            metadata_scheduler: SchedulerPolicy {
                min_interval: Duration::from_millis(100),
                ..SchedulerPolicy::default()
            },
            ttl: TtlPolicy::default(),
            library_path: data_dir().join("db.json"),
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails when `SPOTIFY_CLIENT_ID` or `SPOTIFY_CLIENT_SECRET` is missing, or
    /// when a numeric variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new(required("SPOTIFY_CLIENT_ID")?, required("SPOTIFY_CLIENT_SECRET")?);

        override_with(&mut config.server_address, "SERVER_ADDRESS");
        override_with(&mut config.spotify_api_url, "SPOTIFY_API_URL");
        override_with(&mut config.spotify_token_url, "SPOTIFY_TOKEN_URL");
        override_with(&mut config.spotify_auth_url, "SPOTIFY_AUTH_URL");
        override_with(&mut config.redirect_uri, "SPOTIFY_REDIRECT_URI");
        override_with(&mut config.scope, "SPOTIFY_SCOPE");
        override_with(&mut config.frontend_url, "FRONTEND_URL");
        override_with(&mut config.deezer_api_url, "DEEZER_API_URL");
        override_with(&mut config.default_market, "DEFAULT_MARKET");

        if let Some(ms) = parsed::<u64>("MIN_REQUEST_INTERVAL_MS")? {
            config.scheduler.min_interval = Duration::from_millis(ms);
        }
        if let Some(retries) = parsed::<u32>("MAX_RETRIES")? {
            config.scheduler.max_retries = retries;
        }
        if let Ok(path) = env::var("LIBRARY_PATH") {
            config.library_path = PathBuf::from(path);
        }

        Ok(config)
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ProxyError::config(format!("{name} must be set")))
}

fn override_with(target: &mut String, name: &str) {
    if let Ok(value) = env::var(name) {
        if !value.trim().is_empty() {
            *target = value;
        }
    }
}

fn parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ProxyError::config(format!("{name} has an invalid value: {raw}"))),
        Err(_) => Ok(None),
    }
}
