use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use tunebridge::config::Config;
use tunebridge::credential::CredentialProvider;
use tunebridge::error::ProxyError;
use tunebridge::upstream::http_client;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> CredentialProvider {
    let mut config = Config::new("id", "secret");
    config.spotify_token_url = format!("{}/api/token", server.uri());
    CredentialProvider::new(http_client("tunebridge-test").unwrap(), &config)
}

fn token_response(token: &str, expires_in: u64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_in": expires_in,
    }))
}

#[tokio::test]
async fn test_credential_is_reused_while_valid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        // base64("id:secret")
        .and(header("authorization", "Basic aWQ6c2VjcmV0"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("tok-1", 3600))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let first = provider.get_credential().await.unwrap();
    let second = provider.get_credential().await.unwrap();

    assert_eq!(first.value, "tok-1");
    assert_eq!(second.value, "tok-1");
    assert!(first.expires_in() > Duration::from_secs(3500));
}

#[tokio::test]
async fn test_concurrent_callers_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(token_response("shared", 3600).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let results = join_all((0..8).map(|_| provider.get_credential())).await;

    for result in results {
        assert_eq!(result.unwrap().value, "shared");
    }
}

#[tokio::test]
async fn test_credential_near_expiry_is_refreshed() {
    let server = MockServer::start().await;
    // under the 60 s margin, so never reusable
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(token_response("short-lived", 30))
        .expect(2)
        .mount(&server)
        .await;

    let provider = provider(&server);
    provider.get_credential().await.unwrap();
    provider.get_credential().await.unwrap();
}

#[tokio::test]
async fn test_rejected_exchange_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider.get_credential().await.unwrap_err();

    assert!(matches!(err, ProxyError::UpstreamAuth(ref m) if m.contains("400")));
    assert_eq!(err.status().as_u16(), 500);
    assert!(provider.current().await.is_none());
}

#[tokio::test]
async fn test_concurrent_callers_share_a_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let results = join_all((0..4).map(|_| provider.get_credential())).await;

    assert!(
        results
            .iter()
            .all(|r| matches!(r, Err(ProxyError::UpstreamAuth(_))))
    );
}

#[tokio::test]
async fn test_malformed_token_body_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let provider = provider(&server);
    let err = provider.get_credential().await.unwrap_err();
    assert!(matches!(err, ProxyError::UpstreamAuth(_)));
}
