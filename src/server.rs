use std::{net::SocketAddr, str::FromStr};

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    api::{self, AppState},
    error::{ProxyError, Result},
};

/// Every route of the server, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/login", get(api::login))
        .route("/callback", get(api::callback))
        .route("/refresh-token", post(api::refresh_token))
        .route("/api/spotify/{*path}", get(api::spotify_proxy))
        .route("/api/deezer/{*path}", get(api::deezer_proxy))
        .route("/api/convert", post(api::convert))
        .nest("/api/local", api::local::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process ends.
///
/// The client credential is acquired before the listener opens; a failure
/// there is logged and retried lazily by the first request that needs it.
pub async fn start_api_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from_str(&state.config.server_address).map_err(|e| {
        ProxyError::config(format!(
            "invalid server address {}: {e}",
            state.config.server_address
        ))
    })?;

    match state.credentials.get_credential().await {
        Ok(credential) => info!(
            expires_in_s = credential.expires_in().as_secs(),
            "Client credential ready"
        ),
        Err(e) => warn!(error = %e, "Could not pre-warm the client credential"),
    }

    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
