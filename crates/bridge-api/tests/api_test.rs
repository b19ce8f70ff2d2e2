//! Admin API tests over a live server on an ephemeral port.

use std::{net::SocketAddr, sync::Arc};

use bridge_core::{NoOpPublisher, RealClock};
use bridge_delivery::{Bridge, ClientConfig};
use bridge_store::SqliteStore;
use serde_json::{json, Value};

/// Boots a bridge with an in-memory store and serves it, returning the
/// base URL.
async fn serve_bridge() -> String {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let bridge = Arc::new(
        Bridge::new(
            store,
            Arc::new(NoOpPublisher::new()),
            Arc::new(RealClock::new()),
            ClientConfig::default(),
        )
        .unwrap(),
    );

    let app = bridge_api::create_router(bridge);
    let listener =
        tokio::net::TcpListener::bind("127.0.0.1:0".parse::<SocketAddr>().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

#[tokio::test]
async fn subscriber_lifecycle_over_http() {
    let base = serve_bridge().await;
    let http = reqwest::Client::new();

    // Register.
    let created: Value = http
        .post(format!("{base}/subscribers"))
        .json(&json!({"url": "https://example.com/hook", "events": ["integration_*"]}))
        .send()
        .await
        .unwrap()
        .error_for_status()
        .unwrap()
        .json()
        .await
        .unwrap();

    let secret = created["secret"].as_str().unwrap();
    assert_eq!(secret.len(), 64);
    assert!(created["subscriber"].get("secret").is_none());
    assert_eq!(created["subscriber"]["events"], json!(["integration_*"]));
    let id = created["subscriber"]["id"].as_str().unwrap().to_string();

    // List strips secrets.
    let listed: Value =
        http.get(format!("{base}/subscribers")).send().await.unwrap().json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(!listed.to_string().contains(secret));

    // Disable.
    let updated: Value = http
        .patch(format!("{base}/subscribers/{id}"))
        .json(&json!({"enabled": false}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["enabled"], json!(false));

    // Delete, then the id is gone.
    let deleted = http.delete(format!("{base}/subscribers/{id}")).send().await.unwrap();
    assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);

    let missing = http
        .patch(format!("{base}/subscribers/{id}"))
        .json(&json!({"enabled": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_url_is_rejected_with_structured_error() {
    let base = serve_bridge().await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{base}/subscribers"))
        .json(&json!({"url": "ftp://files.example.com"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "invalid_url");

    // Nothing persisted.
    let listed: Value =
        http.get(format!("{base}/subscribers")).send().await.unwrap().json().await.unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_subscriber_operations_return_not_found() {
    let base = serve_bridge().await;
    let http = reqwest::Client::new();
    let bogus = uuid::Uuid::new_v4();

    for (method, url) in [
        ("DELETE", format!("{base}/subscribers/{bogus}")),
        ("POST", format!("{base}/subscribers/{bogus}/test")),
    ] {
        let request = match method {
            "DELETE" => http.delete(&url),
            _ => http.post(&url),
        };
        let response = request.send().await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND, "{method} {url}");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"]["code"], "unknown_subscriber");
    }
}

#[tokio::test]
async fn emit_and_status_round_trip() {
    let base = serve_bridge().await;
    let http = reqwest::Client::new();

    // Emission outside the namespace is accepted and flagged unbridged.
    let ignored: Value = http
        .post(format!("{base}/events"))
        .json(&json!({"type": "renderer_focus_changed", "payload": {}}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ignored["bridged"], json!(false));

    let emitted = http
        .post(format!("{base}/events"))
        .json(&json!({"type": "integration_task_completed", "payload": {"task": 7}}))
        .send()
        .await
        .unwrap();
    assert_eq!(emitted.status(), reqwest::StatusCode::ACCEPTED);
    let emitted: Value = emitted.json().await.unwrap();
    assert_eq!(emitted["bridged"], json!(true));

    let status: Value =
        http.get(format!("{base}/status")).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["subscribers"]["total"], json!(0));
    assert_eq!(status["subscribers"]["enabled"], json!(0));
    assert_eq!(status["stats"]["delivered"], json!(0));
    assert!(status["stats"]["last_event_at"].is_string());
    assert_eq!(status["fanout"], json!({"enabled": false}));
}

#[tokio::test]
async fn test_probe_queues_a_delivery() {
    let base = serve_bridge().await;
    let http = reqwest::Client::new();

    let server = wiremock::MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(wiremock::ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let created: Value = http
        .post(format!("{base}/subscribers"))
        .json(&json!({"url": format!("{}/hook", server.uri())}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["subscriber"]["id"].as_str().unwrap();

    let response =
        http.post(format!("{base}/subscribers/{id}/test")).send().await.unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::ACCEPTED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["queued"], json!(true));

    // The probe lands on the endpoint shortly after.
    for _ in 0..100 {
        if !server.received_requests().await.unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("connectivity probe never reached the endpoint");
}
