use axum::{
    Json,
    extract::{Query, State},
    response::Redirect,
};
use reqwest::Url;
use tracing::{error, info, warn};

use super::AppState;
use crate::{
    error::{ProxyError, Result},
    types::{CallbackParams, RefreshRequest, RefreshedToken},
};

pub async fn login(State(state): State<AppState>) -> Result<Redirect> {
    let url = state.oauth.authorize_url().await?;
    info!("Redirecting to the authorization page");
    Ok(Redirect::to(url.as_str()))
}

/// Finishes the login and hands the tokens to the frontend in the URL
/// fragment. Failures go back as `?error=<reason>`.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend = state.config.frontend_url.as_str();

    if let Some(reason) = params.error {
        warn!(reason = %reason, "Authorization denied");
        return Redirect::to(&error_redirect(frontend, &reason));
    }

    let (Some(code), Some(csrf_state)) = (params.code, params.state) else {
        return Redirect::to(&error_redirect(frontend, "state_mismatch"));
    };

    match state.oauth.exchange_code(&code, &csrf_state).await {
        Ok(token) => {
            let target = format!(
                "{}/#{}",
                frontend.trim_end_matches('/'),
                fragment(&[
                    ("access_token", token.access_token.as_str()),
                    ("refresh_token", token.refresh_token.as_str()),
                    ("expires_in", token.expires_in.to_string().as_str()),
                ])
            );
            Redirect::to(&target)
        }
        Err(ProxyError::BadRequest(reason)) => {
            warn!(reason = %reason, "Rejected login callback");
            Redirect::to(&error_redirect(frontend, &reason))
        }
        Err(e) => {
            error!(error = %e, "Code exchange failed");
            Redirect::to(&error_redirect(frontend, "invalid_token"))
        }
    }
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<RefreshedToken>> {
    let refresh_token = request
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ProxyError::bad_request("Refresh token is required"))?;

    let token = state.oauth.refresh(&refresh_token).await.map_err(|e| {
        warn!(error = %e, "Token refresh failed");
        ProxyError::bad_request(format!("Failed to refresh token: {e}"))
    })?;
    Ok(Json(token))
}

fn error_redirect(frontend: &str, reason: &str) -> String {
    format!(
        "{}/?{}",
        frontend.trim_end_matches('/'),
        fragment(&[("error", reason)])
    )
}

/// Form-encodes `pairs` with the same rules as a query string.
fn fragment(pairs: &[(&str, &str)]) -> String {
    Url::parse_with_params("http://localhost/", pairs)
        .ok()
        .and_then(|url| url.query().map(str::to_owned))
        .unwrap_or_default()
}
