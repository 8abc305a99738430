use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabled::Tabled;

/// Body of a client-credentials grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientTokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

/// Token obtained through the authorization-code flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    /// Track id on the metadata API, string or number.
    pub deezer_id: Option<Value>,
    pub spotify_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub spotify_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover: Option<String>,
    #[serde(default = "default_creator")]
    pub creator: String,
    #[serde(default)]
    pub tracks: Vec<Value>,
    #[serde(default)]
    pub created_at: String,
}

fn default_creator() -> String {
    "You".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPlaylist {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cover: Option<String>,
    pub creator: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistUpdate {
    pub name: Option<String>,
    /// Absent leaves the cover alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    pub cover: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub current_track: Option<Value>,
    pub playback_queue: Vec<Value>,
    pub is_shuffle: bool,
    pub repeat_mode: String,
    pub volume: u8,
    pub progress_ms: u64,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_track: None,
            playback_queue: Vec::new(),
            is_shuffle: false,
            repeat_mode: "off".to_string(),
            volume: 60,
            progress_ms: 0,
        }
    }
}

/// Everything the local library file holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryData {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default)]
    pub likes: Vec<Value>,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub artists: Vec<Value>,
    #[serde(default)]
    pub player_state: PlayerState,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    pub id: String,
    pub name: String,
    pub artist: String,
}

#[derive(Tabled)]
pub struct PlaylistTableRow {
    pub id: String,
    pub name: String,
    pub tracks: usize,
    pub created: String,
}

#[derive(Tabled)]
pub struct ArtistTableRow {
    pub id: String,
    pub name: String,
}
