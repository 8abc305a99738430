use std::path::PathBuf;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{ProxyError, Result},
    types::{LibraryData, NewPlaylist, Playlist, PlaylistUpdate},
    utils::item_id,
};

/// Entries kept in the listening history.
const HISTORY_CAPACITY: usize = 50;
/// Entries returned by [`LibraryManager::recent_history`].
const HISTORY_PAGE: usize = 20;

/// JSON-file backed store for playlists, likes, history and followed artists.
///
/// Every mutation is a load-modify-save cycle under one async lock, so
/// concurrent requests never interleave their writes.
pub struct LibraryManager {
    path: PathBuf,
    lock: Mutex<()>,
}

impl LibraryManager {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Sibling of the store that saves are written to first.
    pub fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    pub async fn load(&self) -> Result<LibraryData> {
        match async_fs::read_to_string(&self.path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LibraryData::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, data: &LibraryData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // The store itself is only ever replaced whole.
        let json = serde_json::to_string_pretty(data)?;
        let staging = self.staging_path();
        async_fs::write(&staging, json).await?;
        async_fs::rename(&staging, &self.path).await?;
        debug!(path = %self.path.display(), "Library saved");
        Ok(())
    }

    /// Runs `change` on the stored data and saves it when `change` says so.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut LibraryData) -> Result<(T, bool)>,
    ) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let (out, dirty) = change(&mut data)?;
        if dirty {
            self.persist(&data).await?;
        }
        Ok(out)
    }

    pub async fn list_artists(&self) -> Result<Vec<Value>> {
        Ok(self.load().await?.artists)
    }

    /// Follows `artist`. Returns `false` when it was already followed.
    pub async fn follow_artist(&self, artist: Value) -> Result<bool> {
        let id = item_id(&artist).ok_or_else(|| ProxyError::bad_request("Invalid artist"))?;
        self.update(|data| {
            if contains(&data.artists, &id) {
                return Ok((false, false));
            }
            data.artists.push(artist);
            Ok((true, true))
        })
        .await
    }

    pub async fn unfollow_artist(&self, id: &str) -> Result<()> {
        self.update(|data| {
            let index = position(&data.artists, id).ok_or_else(|| ProxyError::not_found("Artist"))?;
            data.artists.remove(index);
            Ok(((), true))
        })
        .await
    }

    pub async fn is_following(&self, id: &str) -> Result<bool> {
        Ok(contains(&self.load().await?.artists, id))
    }

    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.load().await?.playlists)
    }

    pub async fn create_playlist(&self, request: NewPlaylist) -> Result<Playlist> {
        let name = request
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ProxyError::bad_request("Name is required"))?;

        self.update(|data| {
            let mut stamp = Utc::now().timestamp_millis();
            while data.playlists.iter().any(|p| p.id == stamp.to_string()) {
                stamp += 1;
            }

            let playlist = Playlist {
                id: stamp.to_string(),
                name,
                description: request.description.unwrap_or_default(),
                cover: request.cover,
                creator: request.creator.unwrap_or_else(|| "You".to_string()),
                tracks: Vec::new(),
                created_at: Utc::now().to_rfc3339(),
            };
            data.playlists.push(playlist.clone());
            Ok((playlist, true))
        })
        .await
    }

    pub async fn update_playlist(&self, id: &str, update: PlaylistUpdate) -> Result<Playlist> {
        self.update(|data| {
            let playlist = find_playlist(data, id)?;
            if let Some(name) = update.name.filter(|n| !n.trim().is_empty()) {
                playlist.name = name;
            }
            if let Some(cover) = update.cover {
                playlist.cover = cover;
            }
            Ok((playlist.clone(), true))
        })
        .await
    }

    pub async fn delete_playlist(&self, id: &str) -> Result<()> {
        self.update(|data| {
            let index = data
                .playlists
                .iter()
                .position(|p| p.id == id)
                .ok_or_else(|| ProxyError::not_found("Playlist"))?;
            data.playlists.remove(index);
            Ok(((), true))
        })
        .await
    }

    /// Appends the tracks not already in the playlist. Returns the playlist
    /// and how many tracks were added.
    pub async fn add_tracks(&self, id: &str, tracks: Vec<Value>) -> Result<(Playlist, usize)> {
        self.update(|data| {
            let playlist = find_playlist(data, id)?;
            let mut added = 0;
            for track in tracks {
                let Some(track_id) = item_id(&track) else {
                    continue;
                };
                if !contains(&playlist.tracks, &track_id) {
                    playlist.tracks.push(track);
                    added += 1;
                }
            }
            Ok(((playlist.clone(), added), added > 0))
        })
        .await
    }

    pub async fn remove_track(&self, id: &str, track_id: &str) -> Result<Playlist> {
        self.update(|data| {
            let playlist = find_playlist(data, id)?;
            let before = playlist.tracks.len();
            playlist
                .tracks
                .retain(|t| item_id(t).as_deref() != Some(track_id));
            let changed = playlist.tracks.len() != before;
            Ok((playlist.clone(), changed))
        })
        .await
    }

    pub async fn list_likes(&self) -> Result<Vec<Value>> {
        Ok(self.load().await?.likes)
    }

    /// Likes `track`, or unlikes it when it already is. Returns the new state.
    pub async fn toggle_like(&self, track: Value) -> Result<bool> {
        let id = item_id(&track).ok_or_else(|| ProxyError::bad_request("Invalid track"))?;
        self.update(|data| match position(&data.likes, &id) {
            Some(index) => {
                data.likes.remove(index);
                Ok((false, true))
            }
            None => {
                data.likes.push(track);
                Ok((true, true))
            }
        })
        .await
    }

    pub async fn is_liked(&self, id: &str) -> Result<bool> {
        Ok(contains(&self.load().await?.likes, id))
    }

    /// Most recent history entries, newest first.
    pub async fn recent_history(&self) -> Result<Vec<Value>> {
        let history = self.load().await?.history;
        Ok(history.into_iter().rev().take(HISTORY_PAGE).collect())
    }

    /// Records a play. A track already in the history moves to the end.
    pub async fn push_history(&self, track: Value) -> Result<()> {
        let id = item_id(&track).ok_or_else(|| ProxyError::bad_request("Invalid track"))?;
        self.update(|data| {
            if let Some(index) = position(&data.history, &id) {
                data.history.remove(index);
            }
            data.history.push(track);
            if data.history.len() > HISTORY_CAPACITY {
                let excess = data.history.len() - HISTORY_CAPACITY;
                data.history.drain(..excess);
            }
            Ok(((), true))
        })
        .await
    }
}

fn position(items: &[Value], id: &str) -> Option<usize> {
    items.iter().position(|item| item_id(item).as_deref() == Some(id))
}

fn contains(items: &[Value], id: &str) -> bool {
    position(items, id).is_some()
}

fn find_playlist<'a>(data: &'a mut LibraryData, id: &str) -> Result<&'a mut Playlist> {
    data.playlists
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| ProxyError::not_found("Playlist"))
}
