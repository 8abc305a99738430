//! Authorization-code flow for end users.
//!
//! The proxy only brokers the login: it builds the authorize URL, exchanges
//! the returned code, and refreshes user tokens on request. User tokens are
//! handed back to the frontend and never stored server-side.
//!
//! Each login carries a random `state` and a PKCE verifier. The verifier is
//! kept in memory under its state until the callback consumes it, so a
//! callback with an unknown state is rejected. Logins left unfinished for
//! longer than [`LOGIN_TIMEOUT`] are forgotten.

use std::{collections::HashMap, time::Duration};

use reqwest::{Client, Url};
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{ProxyError, Result},
    types::{RefreshedToken, UserToken},
    utils,
};

/// How long a started login waits for its callback.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10 * 60);

struct PendingLogin {
    code_verifier: String,
    started: Instant,
}

impl PendingLogin {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.started) >= LOGIN_TIMEOUT
    }
}

pub struct OAuthClient {
    http: Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    redirect_uri: String,
    scope: String,
    /// PKCE verifiers of logins in progress, by state.
    pending: Mutex<HashMap<String, PendingLogin>>,
}

impl OAuthClient {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            auth_url: config.spotify_auth_url.clone(),
            token_url: config.spotify_token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a login and returns the URL to send the browser to.
    pub async fn authorize_url(&self) -> Result<Url> {
        let code_verifier = utils::generate_code_verifier();
        let code_challenge = utils::generate_code_challenge(&code_verifier);
        let state = utils::generate_state();

        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_challenge", code_challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("scope", self.scope.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| ProxyError::config(format!("invalid authorize URL: {e}")))?;

        let now = Instant::now();
        let mut pending = self.pending.lock().await;
        pending.retain(|_, login| !login.is_stale(now));
        pending.insert(
            state,
            PendingLogin {
                code_verifier,
                started: now,
            },
        );
        Ok(url)
    }

    /// Number of logins still waiting for their callback.
    pub async fn pending_logins(&self) -> usize {
        let now = Instant::now();
        self.pending
            .lock()
            .await
            .values()
            .filter(|login| !login.is_stale(now))
            .count()
    }

    /// Completes a login started by [`OAuthClient::authorize_url`].
    ///
    /// An unknown or timed-out `state` is rejected as `state_mismatch`.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<UserToken> {
        let verifier = self
            .pending
            .lock()
            .await
            .remove(state)
            .filter(|login| !login.is_stale(Instant::now()))
            .map(|login| login.code_verifier)
            .ok_or_else(|| ProxyError::bad_request("state_mismatch"))?;

        let json = self
            .post_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("code_verifier", verifier.as_str()),
            ])
            .await?;

        let token: UserToken = serde_json::from_value(json)?;
        info!("User token obtained");
        Ok(token)
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedToken> {
        let json = self
            .post_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        let token: RefreshedToken = serde_json::from_value(json)?;
        info!("User token refreshed");
        Ok(token)
    }

    async fn post_token(&self, form: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "Token endpoint rejected the request");
            return Err(ProxyError::upstream(status.as_u16(), utils::excerpt(&body)));
        }

        Ok(serde_json::from_str(&body)?)
    }
}
