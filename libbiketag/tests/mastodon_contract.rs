//! Mastodon client contract tests
//!
//! A wiremock server plays the Mastodon REST API so the megalodon-backed
//! connector and publisher are exercised over real HTTP: request shapes,
//! response parsing, and how error responses are classified.

use libbiketag::credentials::CredentialSource;
use libbiketag::error::{BiketagError, CredentialError, PlatformError};
use libbiketag::platforms::mastodon::MastodonConnector;
use libbiketag::platforms::{Connector, Publisher};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VERIFY_PATH: &str = "/api/v1/accounts/verify_credentials";

fn account_json() -> serde_json::Value {
    json!({
        "id": "109",
        "username": "seattlebiketag",
        "acct": "seattlebiketag",
        "display_name": "Seattle BikeTag",
        "locked": false,
        "group": false,
        "created_at": "2022-11-01T00:00:00.000Z",
        "followers_count": 10,
        "following_count": 0,
        "statuses_count": 41,
        "note": "",
        "url": "https://botsin.space/@seattlebiketag",
        "avatar": "",
        "avatar_static": "",
        "header": "",
        "header_static": "",
        "emojis": [],
        "fields": [],
        "bot": true
    })
}

fn status_json(id: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "uri": format!("https://botsin.space/users/seattlebiketag/statuses/{}", id),
        "url": format!("https://botsin.space/@seattlebiketag/{}", id),
        "account": account_json(),
        "content": content,
        "created_at": "2024-05-01T12:00:00.000Z",
        "emojis": [],
        "replies_count": 0,
        "reblogs_count": 0,
        "favourites_count": 0,
        "sensitive": false,
        "spoiler_text": "",
        "visibility": "public",
        "media_attachments": [],
        "mentions": [],
        "tags": []
    })
}

/// Credential file in a temp dir; keeps the dir alive with the source
fn credentials(lines: &str) -> (TempDir, CredentialSource) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(&path, lines).unwrap();
    (dir, CredentialSource::new(path))
}

async fn mount_verify_ok(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_json()))
        .mount(server)
        .await;
}

async fn mount_verify_rejected(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": "The access token is invalid"})),
        )
        .mount(server)
        .await;
}

async fn connect(server: &MockServer, source: CredentialSource) -> libbiketag::Result<Box<dyn Publisher>> {
    MastodonConnector::new(server.uri(), source).connect().await
}

// ────────────────────────────────────────────────────────────────────────────
// Credential exchange
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_token_without_refresh_is_fatal() {
    let server = MockServer::start().await;
    mount_verify_rejected(&server, "bad").await;
    let (_dir, source) = credentials("access_token=bad\n");

    let err = match connect(&server, source).await {
        Ok(_) => panic!("a rejected token must not yield a session"),
        Err(e) => e,
    };

    assert!(matches!(err, BiketagError::Credential(CredentialError::Rejected(_))));
    assert!(err.is_fatal());
    assert_eq!(err.exit_code(), 2);
}

#[tokio::test]
async fn test_rejected_token_is_refreshed() {
    let server = MockServer::start().await;
    mount_verify_rejected(&server, "stale").await;
    mount_verify_ok(&server, "fresh").await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_partial_json(json!({
            "client_id": "client-id",
            "client_secret": "client-secret",
            "refresh_token": "refresh-me"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "token_type": "Bearer",
            "scope": "read write",
            "created_at": 1714564800
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, source) = credentials(
        "consumer_key=client-id\n\
         consumer_secret=client-secret\n\
         access_token=stale\n\
         access_token_secret=refresh-me\n",
    );

    let session = connect(&server, source).await.unwrap();
    assert_eq!(session.name(), "mastodon");
    session.verify().await.unwrap();
}

#[tokio::test]
async fn test_failed_refresh_is_fatal() {
    let server = MockServer::start().await;
    mount_verify_rejected(&server, "stale").await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let (_dir, source) = credentials(
        "consumer_key=id\nconsumer_secret=secret\naccess_token=stale\naccess_token_secret=old\n",
    );

    let err = match connect(&server, source).await {
        Ok(_) => panic!("a failed refresh must not yield a session"),
        Err(e) => e,
    };
    assert!(matches!(err, BiketagError::Credential(CredentialError::Rejected(_))));
}

#[tokio::test]
async fn test_server_error_during_exchange_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(VERIFY_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;
    let (_dir, source) = credentials("access_token=good\n");

    let err = match connect(&server, source).await {
        Ok(_) => panic!("a 503 must not yield a session"),
        Err(e) => e,
    };
    assert!(matches!(err, BiketagError::Platform(PlatformError::Network(_))));
    assert!(!err.is_fatal());
}

// ────────────────────────────────────────────────────────────────────────────
// Session calls
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_latest_status_reads_own_newest_post() {
    let server = MockServer::start().await;
    mount_verify_ok(&server, "good").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/109/statuses"))
        .and(query_param("limit", "1"))
        .and(query_param("exclude_reblogs", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([status_json(
            "1",
            "<p>bike tag number 41 by Bob</p>"
        )])))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, source) = credentials("access_token=good\n");

    let session = connect(&server, source).await.unwrap();
    let text = session.latest_status_text().await.unwrap();

    assert_eq!(text.as_deref(), Some("<p>bike tag number 41 by Bob</p>"));
}

#[tokio::test]
async fn test_latest_status_of_empty_account() {
    let server = MockServer::start().await;
    mount_verify_ok(&server, "good").await;
    Mock::given(method("GET"))
        .and(path("/api/v1/accounts/109/statuses"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    let (_dir, source) = credentials("access_token=good\n");

    let session = connect(&server, source).await.unwrap();
    assert_eq!(session.latest_status_text().await.unwrap(), None);
}

#[tokio::test]
async fn test_upload_sends_description() {
    let server = MockServer::start().await;
    mount_verify_ok(&server, "good").await;
    Mock::given(method("POST"))
        .and(path("/api/v2/media"))
        .and(body_string_contains("Alice's bike at SeattleBikeTag mystery location #42."))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "type": "image",
            "url": "https://files.botsin.space/m1.jpg",
            "description": "Alice's bike at SeattleBikeTag mystery location #42."
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (dir, source) = credentials("access_token=good\n");
    let image = dir.path().join("tag.jpg");
    std::fs::write(&image, b"jpeg bytes").unwrap();

    let session = connect(&server, source).await.unwrap();
    let media_id = session
        .upload_media(&image, "Alice's bike at SeattleBikeTag mystery location #42.")
        .await
        .unwrap();

    assert_eq!(media_id, "m1");
}

#[tokio::test]
async fn test_post_status_returns_id_and_url() {
    let server = MockServer::start().await;
    mount_verify_ok(&server, "good").await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .and(body_partial_json(json!({
            "status": "bike tag number 42 by Alice",
            "media_ids": ["m1"]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_json("112", "<p>bike tag number 42 by Alice</p>")),
        )
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, source) = credentials("access_token=good\n");

    let session = connect(&server, source).await.unwrap();
    let status = session
        .post_status("bike tag number 42 by Alice", &["m1".to_string()])
        .await
        .unwrap();

    assert_eq!(status.id, "112");
    assert_eq!(
        status.url.as_deref(),
        Some("https://botsin.space/@seattlebiketag/112")
    );
}

#[tokio::test]
async fn test_rate_limited_post_is_classified() {
    let server = MockServer::start().await;
    mount_verify_ok(&server, "good").await;
    Mock::given(method("POST"))
        .and(path("/api/v1/statuses"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "Too many requests"})))
        .mount(&server)
        .await;
    let (_dir, source) = credentials("access_token=good\n");

    let session = connect(&server, source).await.unwrap();
    let err = session.post_status("text", &[]).await.unwrap_err();

    assert!(matches!(err, BiketagError::Platform(PlatformError::RateLimit(_))));
    assert!(!err.is_fatal());
}
