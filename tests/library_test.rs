use serde_json::json;
use tempfile::TempDir;
use tunebridge::error::ProxyError;
use tunebridge::management::LibraryManager;
use tunebridge::types::{NewPlaylist, PlaylistUpdate};

fn manager(dir: &TempDir) -> LibraryManager {
    LibraryManager::new(dir.path().join("nested").join("db.json"))
}

fn new_playlist(name: &str) -> NewPlaylist {
    NewPlaylist {
        name: Some(name.to_string()),
        ..NewPlaylist::default()
    }
}

#[tokio::test]
async fn test_missing_file_loads_defaults() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    let data = library.load().await.unwrap();
    assert!(data.playlists.is_empty());
    assert!(data.likes.is_empty());
    assert_eq!(data.player_state.volume, 60);
    assert_eq!(data.player_state.repeat_mode, "off");
}

#[tokio::test]
async fn test_partial_file_gets_defaults_filled() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(&path, r#"{ "likes": [{ "id": 1 }] }"#).unwrap();

    let library = LibraryManager::new(path);
    let data = library.load().await.unwrap();
    assert_eq!(data.likes.len(), 1);
    assert!(data.history.is_empty());
}

#[tokio::test]
async fn test_follow_and_unfollow_artist() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    assert!(library.follow_artist(json!({ "id": 27, "name": "Daft Punk" })).await.unwrap());
    assert!(!library.follow_artist(json!({ "id": "27" })).await.unwrap());
    assert!(library.is_following("27").await.unwrap());
    assert_eq!(library.list_artists().await.unwrap().len(), 1);

    library.unfollow_artist("27").await.unwrap();
    assert!(!library.is_following("27").await.unwrap());

    let err = library.unfollow_artist("27").await.unwrap_err();
    assert!(matches!(err, ProxyError::NotFound(_)));

    let err = library.follow_artist(json!({ "name": "no id" })).await.unwrap_err();
    assert!(matches!(err, ProxyError::BadRequest(_)));
}

#[tokio::test]
async fn test_playlist_lifecycle() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    let playlist = library.create_playlist(new_playlist("Road trip")).await.unwrap();
    assert_eq!(playlist.creator, "You");
    assert!(playlist.id.parse::<i64>().is_ok());
    assert!(chrono::DateTime::parse_from_rfc3339(&playlist.created_at).is_ok());

    let (updated, added) = library
        .add_tracks(&playlist.id, vec![json!({ "id": 1 }), json!({ "id": 2 }), json!({ "id": 1 })])
        .await
        .unwrap();
    assert_eq!(added, 2);
    assert_eq!(updated.tracks.len(), 2);

    let (_, added) = library
        .add_tracks(&playlist.id, vec![json!({ "id": "2" })])
        .await
        .unwrap();
    assert_eq!(added, 0);

    let renamed = library
        .update_playlist(
            &playlist.id,
            PlaylistUpdate {
                name: Some("Night drive".to_string()),
                cover: Some(None),
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Night drive");
    assert_eq!(renamed.cover, None);

    let trimmed = library.remove_track(&playlist.id, "1").await.unwrap();
    assert_eq!(trimmed.tracks, vec![json!({ "id": 2 })]);

    library.delete_playlist(&playlist.id).await.unwrap();
    assert!(library.list_playlists().await.unwrap().is_empty());

    let err = library.delete_playlist(&playlist.id).await.unwrap_err();
    assert_eq!(err.status().as_u16(), 404);
}

#[tokio::test]
async fn test_playlist_requires_name_and_unique_ids() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    let err = library.create_playlist(new_playlist(" ")).await.unwrap_err();
    assert!(matches!(err, ProxyError::BadRequest(ref m) if m == "Name is required"));

    let a = library.create_playlist(new_playlist("a")).await.unwrap();
    let b = library.create_playlist(new_playlist("b")).await.unwrap();
    assert_ne!(a.id, b.id);
}

#[tokio::test]
async fn test_cover_is_left_alone_when_absent() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    let playlist = library
        .create_playlist(NewPlaylist {
            name: Some("covered".to_string()),
            cover: Some("data:image/png;base64,AAAA".to_string()),
            ..NewPlaylist::default()
        })
        .await
        .unwrap();

    let update: PlaylistUpdate = serde_json::from_value(json!({ "name": "renamed" })).unwrap();
    let updated = library.update_playlist(&playlist.id, update).await.unwrap();
    assert_eq!(updated.cover.as_deref(), Some("data:image/png;base64,AAAA"));

    let update: PlaylistUpdate = serde_json::from_value(json!({ "cover": null })).unwrap();
    let updated = library.update_playlist(&playlist.id, update).await.unwrap();
    assert_eq!(updated.cover, None);
}

#[tokio::test]
async fn test_toggle_like() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    assert!(library.toggle_like(json!({ "id": 5 })).await.unwrap());
    assert!(library.is_liked("5").await.unwrap());
    assert!(!library.toggle_like(json!({ "id": "5" })).await.unwrap());
    assert!(!library.is_liked("5").await.unwrap());
}

#[tokio::test]
async fn test_history_moves_duplicates_and_caps() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);

    for id in 0..60 {
        library.push_history(json!({ "id": id })).await.unwrap();
    }
    library.push_history(json!({ "id": 30 })).await.unwrap();

    let data = library.load().await.unwrap();
    assert_eq!(data.history.len(), 50);
    assert_eq!(data.history.last(), Some(&json!({ "id": 30 })));
    assert_eq!(data.history.first(), Some(&json!({ "id": 10 })));

    let recent = library.recent_history().await.unwrap();
    assert_eq!(recent.len(), 20);
    assert_eq!(recent[0], json!({ "id": 30 }));
    assert_eq!(recent[1], json!({ "id": 59 }));
}

#[tokio::test]
async fn test_data_survives_a_new_manager() {
    let dir = TempDir::new().unwrap();
    manager(&dir).toggle_like(json!({ "id": 9 })).await.unwrap();

    let reopened = manager(&dir);
    assert!(reopened.is_liked("9").await.unwrap());
}

#[tokio::test]
async fn test_interrupted_save_leaves_store_intact() {
    let dir = TempDir::new().unwrap();
    let library = manager(&dir);
    library.follow_artist(json!({ "id": 27 })).await.unwrap();

    // a save that died halfway only ever touched the staging file
    let staging = library.staging_path();
    assert_eq!(staging, dir.path().join("nested").join("db.json.tmp"));
    std::fs::write(&staging, r#"{ "artists": [{ "id""#).unwrap();
    assert!(library.is_following("27").await.unwrap());

    library.follow_artist(json!({ "id": 4 })).await.unwrap();
    assert!(!staging.exists());
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(library.path()).unwrap()).unwrap();
    assert_eq!(saved["artists"].as_array().unwrap().len(), 2);
}
