//! Routes of the local library, nested under `/api/local`.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use super::AppState;
use crate::{
    error::Result,
    types::{NewPlaylist, Playlist, PlaylistUpdate},
    utils::item_id,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/artists", get(list_artists).post(follow_artist))
        .route("/artists/{id}", get(is_following).delete(unfollow_artist))
        .route("/playlists", get(list_playlists).post(create_playlist))
        .route("/playlists/{id}", put(update_playlist).delete(delete_playlist))
        .route("/playlists/{id}/tracks", post(add_tracks))
        .route("/playlists/{id}/tracks/{track_id}", delete(remove_track))
        .route("/likes", get(list_likes).post(toggle_like))
        .route("/likes/{id}", get(is_liked))
        .route("/history", get(recent_history).post(push_history))
}

async fn list_artists(State(state): State<AppState>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.library.list_artists().await?))
}

async fn follow_artist(
    State(state): State<AppState>,
    Json(artist): Json<Value>,
) -> Result<Json<Value>> {
    let body = if state.library.follow_artist(artist).await? {
        json!({ "followed": true })
    } else {
        json!({ "followed": true, "message": "Already followed" })
    };
    Ok(Json(body))
}

async fn unfollow_artist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.library.unfollow_artist(&id).await?;
    Ok(Json(json!({ "followed": false })))
}

async fn is_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    let followed = state.library.is_following(&id).await?;
    Ok(Json(json!({ "followed": followed })))
}

async fn list_playlists(State(state): State<AppState>) -> Result<Json<Vec<Playlist>>> {
    Ok(Json(state.library.list_playlists().await?))
}

async fn create_playlist(
    State(state): State<AppState>,
    Json(request): Json<NewPlaylist>,
) -> Result<Json<Playlist>> {
    Ok(Json(state.library.create_playlist(request).await?))
}

async fn update_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PlaylistUpdate>,
) -> Result<Json<Playlist>> {
    Ok(Json(state.library.update_playlist(&id, update).await?))
}

async fn delete_playlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>> {
    state.library.delete_playlist(&id).await?;
    Ok(Json(json!({ "success": true })))
}

/// Accepts a single track or an array of tracks.
async fn add_tracks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>> {
    let tracks = match body {
        Value::Array(tracks) => tracks,
        track => vec![track],
    };

    let (playlist, added) = state.library.add_tracks(&id, tracks).await?;
    let mut body = serde_json::to_value(playlist)?;
    body["added"] = json!(added);
    Ok(Json(body))
}

async fn remove_track(
    State(state): State<AppState>,
    Path((id, track_id)): Path<(String, String)>,
) -> Result<Json<Playlist>> {
    Ok(Json(state.library.remove_track(&id, &track_id).await?))
}

async fn list_likes(State(state): State<AppState>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.library.list_likes().await?))
}

async fn toggle_like(
    State(state): State<AppState>,
    Json(track): Json<Value>,
) -> Result<Json<Value>> {
    let track_id = item_id(&track);
    let body = if state.library.toggle_like(track.clone()).await? {
        json!({ "liked": true, "track": track })
    } else {
        json!({ "liked": false, "trackId": track_id })
    };
    Ok(Json(body))
}

async fn is_liked(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let liked = state.library.is_liked(&id).await?;
    Ok(Json(json!({ "liked": liked })))
}

async fn recent_history(State(state): State<AppState>) -> Result<Json<Vec<Value>>> {
    Ok(Json(state.library.recent_history().await?))
}

async fn push_history(
    State(state): State<AppState>,
    Json(track): Json<Value>,
) -> Result<Json<Value>> {
    state.library.push_history(track).await?;
    Ok(Json(json!({ "success": true })))
}
