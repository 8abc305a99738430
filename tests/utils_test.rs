use serde_json::json;
use tunebridge::cli::parse_query_items;
use tunebridge::proxy::{Route, apply_default_market, checked_path, route_for};
use tunebridge::upstream::{build_url, parse_body};
use tunebridge::utils::*;

use reqwest::StatusCode;

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_generate_code_verifier() {
    let verifier = generate_code_verifier();

    // Should be exactly 128 characters
    assert_eq!(verifier.len(), 128);

    // Should contain only alphanumeric characters
    assert!(verifier.chars().all(|c| c.is_ascii_alphanumeric()));

    // Two generated verifiers should be different
    let verifier2 = generate_code_verifier();
    assert_ne!(verifier, verifier2);
}

#[test]
fn test_generate_code_challenge() {
    let verifier = "test_verifier_123";
    let challenge = generate_code_challenge(verifier);

    // SHA-256 is 32 bytes, 43 chars in unpadded base64
    assert_eq!(challenge.len(), 43);
    assert_eq!(challenge, generate_code_challenge(verifier));
    assert_ne!(challenge, generate_code_challenge("different_verifier"));

    assert!(
        challenge
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    );
}

#[test]
fn test_generate_state() {
    let state = generate_state();
    assert_eq!(state.len(), 16);
    assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
}

#[test]
fn test_bearer_token() {
    assert_eq!(bearer_token("Bearer abc"), Some("abc"));
    assert_eq!(bearer_token("bearer abc"), Some("abc"));
    assert_eq!(bearer_token("  Bearer   abc  "), Some("abc"));
    assert_eq!(bearer_token("Bearer "), None);
    assert_eq!(bearer_token(""), None);
}

#[test]
fn test_item_id() {
    // Numbers and strings normalize to the same id
    assert_eq!(item_id(&json!({ "id": 42 })), Some("42".to_string()));
    assert_eq!(item_id(&json!({ "id": "42" })), Some("42".to_string()));
    assert_eq!(item_id(&json!(3135556)), Some("3135556".to_string()));

    assert_eq!(item_id(&json!({ "id": "" })), None);
    assert_eq!(item_id(&json!({ "name": "no id" })), None);
    assert_eq!(item_id(&json!(null)), None);
}

#[test]
fn test_excerpt() {
    let long = "x".repeat(500);
    assert_eq!(excerpt(&long).len(), EXCERPT_LEN);
    assert_eq!(excerpt("short"), "short");
}

#[test]
fn test_route_for() {
    assert_eq!(route_for("me/player"), Route::SelfScoped);
    assert_eq!(route_for("/me"), Route::SelfScoped);
    assert_eq!(route_for("playlists/37i9dQZF1DXcBWIGoYBM5M"), Route::Protected);
    assert_eq!(route_for("shows/abc"), Route::Protected);
    assert_eq!(route_for("episodes/abc"), Route::Protected);
    assert_eq!(route_for("browse/new-releases"), Route::Protected);
    assert_eq!(route_for("artists/123"), Route::Public);
    assert_eq!(route_for("search"), Route::Public);

    // Only the first segment counts
    assert_eq!(route_for("users/me/playlists"), Route::Public);
    assert_eq!(route_for("memes"), Route::Public);
}

#[test]
fn test_checked_path() {
    assert_eq!(checked_path("/artists/123/albums").unwrap(), "artists/123/albums");
    assert_eq!(checked_path("new-releases").unwrap(), "new-releases");
    assert_eq!(checked_path("artists/a..b").unwrap(), "artists/a..b");

    assert!(checked_path("artists/..").is_err());
    assert!(checked_path("artists/%2e").is_err());
    assert!(checked_path("artists/%2E./x").is_err());
    assert!(checked_path("%6De/player").is_err());
    assert!(checked_path("/").is_err());
}

#[test]
fn test_apply_default_market() {
    // Missing market is appended
    let mut query = pairs(&[("limit", "10")]);
    apply_default_market(&mut query, "FR");
    assert_eq!(query, pairs(&[("limit", "10"), ("market", "FR")]));

    // from_token is replaced in place
    let mut query = pairs(&[("market", "from_token"), ("limit", "10")]);
    apply_default_market(&mut query, "FR");
    assert_eq!(query, pairs(&[("market", "FR"), ("limit", "10")]));

    // An explicit market is kept
    let mut query = pairs(&[("market", "US")]);
    apply_default_market(&mut query, "FR");
    assert_eq!(query, pairs(&[("market", "US")]));
}

#[test]
fn test_build_url() {
    let url = build_url(
        "https://api.example.com/v1/",
        "/artists/1/albums",
        &pairs(&[("q", "a b"), ("limit", "2")]),
    )
    .unwrap();
    assert_eq!(
        url.as_str(),
        "https://api.example.com/v1/artists/1/albums?q=a+b&limit=2"
    );

    let url = build_url("https://api.example.com", "search", &[]).unwrap();
    assert_eq!(url.as_str(), "https://api.example.com/search");
}

#[test]
fn test_parse_body() {
    // JSON is parsed whatever the content type says
    let body = parse_body("text/plain", StatusCode::OK, r#"{"ok":true}"#);
    assert_eq!(body, json!({ "ok": true }));

    // Non-JSON text becomes an error payload with an excerpt
    let html = format!("<html>{}</html>", "y".repeat(400));
    let body = parse_body("text/html", StatusCode::BAD_GATEWAY, &html);
    assert_eq!(body["error"]["status"], 502);
    let message = body["error"]["message"].as_str().unwrap();
    assert_eq!(message.chars().count(), EXCERPT_LEN);
    assert!(message.starts_with("<html>"));
}

#[test]
fn test_parse_query_items() {
    let items = vec!["limit=5".to_string(), "q=a=b".to_string()];
    assert_eq!(
        parse_query_items(&items).unwrap(),
        pairs(&[("limit", "5"), ("q", "a=b")])
    );

    let bad = vec!["novalue".to_string()];
    assert_eq!(parse_query_items(&bad).unwrap_err(), "novalue");
}
