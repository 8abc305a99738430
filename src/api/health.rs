use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{Value, json};
use tracing::error;

use super::AppState;

/// Reports liveness together with the client credential and cache state.
/// Acquiring the credential here also pre-warms it.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.credentials.get_credential().await {
        Ok(credential) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "clientToken": "valid",
                "clientTokenExpiresIn": credential.expires_in().as_secs(),
                "cacheSize": state.cache.len(),
            })),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                })),
            )
        }
    }
}
