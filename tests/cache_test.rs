use std::time::Duration;

use serde_json::json;
use tunebridge::cache::{Cache, ResourceClass, TtlPolicy, cache_key};
use tunebridge::proxy::CredentialClass;

#[tokio::test(start_paused = true)]
async fn test_entry_expires_after_ttl() {
    let cache = Cache::new();
    cache.set("k", json!({ "a": 1 }), Duration::from_secs(10));

    tokio::time::advance(Duration::from_secs(9)).await;
    assert_eq!(cache.get("k"), Some(json!({ "a": 1 })));

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(cache.get("k"), None);
}

#[tokio::test(start_paused = true)]
async fn test_stale_entry_is_purged_on_lookup() {
    let cache = Cache::new();
    cache.set("stale", json!(1), Duration::from_secs(1));
    cache.set("fresh", json!(2), Duration::from_secs(60));
    assert_eq!(cache.len(), 2);

    tokio::time::advance(Duration::from_secs(2)).await;

    // expired entries linger until looked up
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get("stale"), None);
    assert_eq!(cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_set_overwrites_value_and_expiry() {
    let cache = Cache::new();
    cache.set("k", json!("old"), Duration::from_secs(1));
    cache.set("k", json!("new"), Duration::from_secs(100));

    tokio::time::advance(Duration::from_secs(50)).await;
    assert_eq!(cache.get("k"), Some(json!("new")));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_null_is_a_storable_value() {
    let cache = Cache::new();
    assert!(cache.is_empty());
    cache.set("negative", json!(null), Duration::from_secs(60));
    assert_eq!(cache.get("negative"), Some(json!(null)));
}

#[test]
fn test_cache_key_separates_credential_classes() {
    let url = "https://api.spotify.com/v1/artists/1";
    let user = cache_key(CredentialClass::User, url);
    let client = cache_key(CredentialClass::Client, url);

    assert_eq!(user, format!("user::{url}"));
    assert_eq!(client, format!("client::{url}"));
    assert_ne!(user, client);
}

#[test]
fn test_resource_class_first_match_wins() {
    assert_eq!(ResourceClass::classify("playlists/1/tracks"), ResourceClass::Playlist);
    assert_eq!(ResourceClass::classify("artists/1/top-tracks"), ResourceClass::Artist);
    assert_eq!(ResourceClass::classify("tracks/1"), ResourceClass::Track);
    assert_eq!(ResourceClass::classify("search"), ResourceClass::Search);
    assert_eq!(ResourceClass::classify("albums/1"), ResourceClass::Default);
}

#[test]
fn test_ttl_policy_defaults() {
    let ttl = TtlPolicy::default();

    assert_eq!(ttl.for_path("playlists/1"), Duration::from_secs(300));
    assert_eq!(ttl.for_path("artists/0TnOYISbd1XYRBk9myaseg"), Duration::from_secs(600));
    assert_eq!(ttl.for_path("tracks/1"), Duration::from_secs(600));
    assert_eq!(ttl.for_path("search"), Duration::from_secs(60));
    assert_eq!(ttl.for_path("albums/1"), Duration::from_secs(300));
    assert_eq!(ttl.name_resolution, Duration::from_secs(300));
    assert_eq!(ttl.conversion, Duration::from_secs(86_400));
}
