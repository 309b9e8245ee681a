//! Scenario: deferred-claim and app-event wire shapes.
//!
//! # Invariants under test
//!
//! 1. `claim_deferred` POSTs `{bundleId, platform, device?}` to
//!    `/api/deferred/claim` and decodes a 2xx answer.
//! 2. `track` POSTs the event body to `/api/app-events` and ignores the
//!    response body; non-2xx classifies as an `Http` error.

use httpmock::prelude::*;
use serde_json::json;

use lmk_api::{ApiError, AttributionApi, HttpAttributionApi};
use lmk_schemas::{AppEvent, LinkMeConfig};

#[tokio::test]
async fn claim_posts_bundle_and_platform() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/deferred/claim")
                .json_body_partial(r#"{"bundleId": "me.link.example", "platform": "ios"}"#);
            then.status(200).json_body(json!({"linkId": "lnk_claim"}));
        })
        .await;

    let api = HttpAttributionApi::new();
    let cfg = LinkMeConfig::with_base_url(&server.base_url()).unwrap();
    let payload = api
        .claim_deferred(&cfg, None, "me.link.example", "ios")
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(payload.link_id.as_deref(), Some("lnk_claim"));
    assert_eq!(payload.is_link_me, Some(true));
}

#[tokio::test]
async fn claim_attaches_device_when_given() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/deferred/claim")
                .json_body_partial(r#"{"device": {"bundleId": "me.link.example"}}"#);
            then.status(200).json_body(json!({}));
        })
        .await;

    let api = HttpAttributionApi::new();
    let cfg = LinkMeConfig::with_base_url(&server.base_url()).unwrap();
    let mut dev = lmk_api::DeviceMap::new();
    dev.insert("bundleId".to_string(), json!("me.link.example"));
    api.claim_deferred(&cfg, Some(&dev), "me.link.example", "ios")
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn claim_miss_is_an_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/deferred/claim");
            then.status(404).json_body(json!({"error": "no_match"}));
        })
        .await;

    let api = HttpAttributionApi::new();
    let cfg = LinkMeConfig::with_base_url(&server.base_url()).unwrap();
    let err = api
        .claim_deferred(&cfg, None, "me.link.example", "ios")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ApiError::Http { status: 404, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn track_posts_event_body() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/app-events")
                .json_body_partial(
                    r#"{"event": "signup", "platform": "ios", "userId": "u-1"}"#,
                );
            then.status(204);
        })
        .await;

    let api = HttpAttributionApi::new();
    let cfg = LinkMeConfig::with_base_url(&server.base_url()).unwrap();
    let ev = AppEvent {
        event: "signup".to_string(),
        platform: "ios".to_string(),
        timestamp: 1_700_000_000,
        user_id: Some("u-1".to_string()),
        props: Some(json!({"plan": "pro"})),
    };
    api.track(&cfg, &ev).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn track_rejection_is_an_http_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/app-events");
            then.status(500).body("boom");
        })
        .await;

    let api = HttpAttributionApi::new();
    let cfg = LinkMeConfig::with_base_url(&server.base_url()).unwrap();
    let ev = AppEvent {
        event: "signup".to_string(),
        platform: "ios".to_string(),
        timestamp: 1_700_000_000,
        user_id: None,
        props: None,
    };
    let err = api.track(&cfg, &ev).await.unwrap_err();

    assert!(
        matches!(err, ApiError::Http { status: 500, .. }),
        "got {err:?}"
    );
}
