//! Client-scoped access credential with lazy, single-flight refresh.
//!
//! The proxy serves catalog requests with a token representing the
//! application itself (client-credentials grant). The token is fetched on
//! first demand and refreshed once it is within the refresh margin of its
//! expiry. Concurrent callers that arrive while a refresh is running await
//! the same exchange instead of starting their own.

use std::time::Duration;

use futures::{
    FutureExt,
    future::{BoxFuture, Shared},
};
use reqwest::Client;
use tokio::{sync::Mutex, time::Instant};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::{ProxyError, Result},
    types::ClientTokenResponse,
    utils,
};

/// An access token and the instant it stops being valid.
#[derive(Debug, Clone)]
pub struct Credential {
    pub value: String,
    pub expires_at: Instant,
}

impl Credential {
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    fn is_valid_for(&self, margin: Duration) -> bool {
        Instant::now() + margin < self.expires_at
    }
}

type Exchange = Shared<BoxFuture<'static, std::result::Result<Credential, String>>>;

#[derive(Default)]
struct State {
    current: Option<Credential>,
    refreshing: Option<Exchange>,
}

pub struct CredentialProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    state: Mutex<State>,
}

impl CredentialProvider {
    pub fn new(http: Client, config: &Config) -> Self {
        Self {
            http,
            token_url: config.spotify_token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_margin: config.refresh_margin,
            state: Mutex::new(State::default()),
        }
    }

    /// Returns a credential valid for at least the refresh margin.
    ///
    /// # Errors
    ///
    /// [`ProxyError::UpstreamAuth`] when the token endpoint answers with a
    /// non-success status or a body without a usable token. Failures are not
    /// retried here and nothing is stored.
    pub async fn get_credential(&self) -> Result<Credential> {
        let exchange = {
            let mut state = self.state.lock().await;
            if let Some(credential) = state
                .current
                .as_ref()
                .filter(|c| c.is_valid_for(self.refresh_margin))
            {
                return Ok(credential.clone());
            }

            match &state.refreshing {
                Some(exchange) => exchange.clone(),
                None => {
                    let exchange = request_token(
                        self.http.clone(),
                        self.token_url.clone(),
                        self.client_id.clone(),
                        self.client_secret.clone(),
                    )
                    .boxed()
                    .shared();
                    state.refreshing = Some(exchange.clone());
                    exchange
                }
            }
        };

        let result = exchange.clone().await;

        let mut state = self.state.lock().await;
        if state
            .refreshing
            .as_ref()
            .is_some_and(|current| current.ptr_eq(&exchange))
        {
            state.refreshing = None;
            if let Ok(credential) = &result {
                state.current = Some(credential.clone());
            }
        }

        result.map_err(ProxyError::UpstreamAuth)
    }

    /// The credential currently held, without refreshing it.
    pub async fn current(&self) -> Option<Credential> {
        self.state.lock().await.current.clone()
    }
}

async fn request_token(
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
) -> std::result::Result<Credential, String> {
    info!("Requesting a new client credentials token");

    let response = http
        .post(&token_url)
        .basic_auth(&client_id, Some(&client_secret))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .map_err(|e| {
            warn!(error = %e, "Client credentials request failed");
            e.to_string()
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "Client credentials exchange rejected");
        return Err(format!("{}: {}", status.as_u16(), utils::excerpt(&body)));
    }

    let token: ClientTokenResponse = serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "Malformed client credentials response");
        format!("malformed token response: {e}")
    })?;
    if token.access_token.is_empty() {
        return Err("token response carried an empty access_token".to_string());
    }

    info!(
        expires_in_min = token.expires_in / 60,
        "Client credentials token obtained"
    );
    Ok(Credential {
        value: token.access_token,
        expires_at: Instant::now() + Duration::from_secs(token.expires_in),
    })
}
