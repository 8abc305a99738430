use axum::{Json, extract::State};
use tracing::error;

use super::AppState;
use crate::{
    error::{ProxyError, Result},
    types::{ConvertRequest, ConvertResponse},
    utils::item_id,
};

/// `POST /api/convert`: metadata track id to streaming track URI.
pub async fn convert(
    State(state): State<AppState>,
    Json(request): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>> {
    let track_id = request.deezer_id.as_ref().and_then(item_id);
    let token = request.spotify_token.filter(|t| !t.is_empty());

    let (Some(track_id), Some(token)) = (track_id, token) else {
        return Err(ProxyError::bad_request("Missing deezerId or spotifyToken"));
    };

    let spotify_uri = state
        .converter
        .convert(&track_id, &token)
        .await
        .inspect_err(|e| error!(track_id = %track_id, error = %e, "Conversion failed"))?;

    Ok(Json(ConvertResponse { spotify_uri }))
}
