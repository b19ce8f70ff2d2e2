//! Facade-level tests: emit routing, secret hygiene, probes, and status.

use std::{sync::Arc, time::Duration};

use bridge_core::{
    time::TestClock, BridgeEvent, BroadcastPublisher, FanoutPublisher, NoOpPublisher,
    SubscriberId,
};
use bridge_delivery::{
    signature::{self, ATTEMPT_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER},
    Bridge, ClientConfig, TEST_EVENT_TYPE,
};
use bridge_store::{SqliteStore, SubscriberStore};
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

async fn bridge_with(fanout: Arc<dyn FanoutPublisher>) -> (Bridge, Arc<SqliteStore>) {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let bridge = Bridge::new(
        store.clone(),
        fanout,
        Arc::new(TestClock::new()),
        ClientConfig::default(),
    )
    .unwrap();
    (bridge, store)
}

async fn drain(bridge: &Bridge) {
    for _ in 0..500 {
        if bridge.pending_deliveries() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("delivery sequences did not settle");
}

#[tokio::test]
async fn emitted_event_reaches_matching_subscriber_signed() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::path("/hook"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let fanout = Arc::new(BroadcastPublisher::new(8));
    let mut observer = fanout.subscribe();
    let (bridge, store) = bridge_with(fanout).await;

    let (view, secret) = bridge
        .create_subscriber(&format!("{}/hook", server.uri()), vec!["integration_*".to_string()])
        .await
        .unwrap();

    let event = BridgeEvent::new("integration_test_event", json!({"x": 1}));
    let event_id = event.id;
    bridge.emit(event).await.unwrap();
    drain(&bridge).await;

    // Exactly one POST, signed over the exact body bytes.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    let header = request.headers.get(SIGNATURE_HEADER).unwrap().to_str().unwrap();
    assert!(signature::verify(&secret, &request.body, header));
    assert!(!signature::verify("wrong-secret", &request.body, header));

    assert_eq!(request.headers.get(ATTEMPT_HEADER).unwrap(), "1");
    assert_eq!(request.headers.get(EVENT_TYPE_HEADER).unwrap(), "integration_test_event");

    // Canonical body carries exactly the emitted event.
    let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
    assert_eq!(body["type"], "integration_test_event");
    assert_eq!(body["payload"], json!({"x": 1}));
    assert_eq!(body["id"], json!(event_id.to_string()));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert!(stats.last_event_at.is_some());

    // Fan-out observer saw the same event.
    let observed = observer.recv().await.unwrap();
    assert_eq!(observed.id, event_id);

    // The subscriber view never carried the secret.
    assert!(serde_json::to_value(&view).unwrap().get("secret").is_none());
}

#[tokio::test]
async fn events_outside_namespace_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (bridge, store) = bridge_with(Arc::new(NoOpPublisher::new())).await;
    bridge
        .create_subscriber(&format!("{}/hook", server.uri()), vec!["*".to_string()])
        .await
        .unwrap();

    bridge.emit(BridgeEvent::new("renderer_focus_changed", json!({}))).await.unwrap();
    drain(&bridge).await;

    assert!(server.received_requests().await.unwrap().is_empty());

    let stats = store.stats().await.unwrap();
    assert!(stats.last_event_at.is_none());
    assert_eq!(stats.delivered, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn disabled_and_non_matching_subscribers_are_skipped() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (bridge, store) = bridge_with(Arc::new(NoOpPublisher::new())).await;

    let (disabled, _) = bridge
        .create_subscriber(&format!("{}/disabled", server.uri()), vec!["*".to_string()])
        .await
        .unwrap();
    bridge.set_subscriber_enabled(disabled.id, false).await.unwrap().unwrap();

    bridge
        .create_subscriber(
            &format!("{}/other", server.uri()),
            vec!["integration_shell_*".to_string()],
        )
        .await
        .unwrap();

    bridge.emit(BridgeEvent::new("integration_task_completed", json!({}))).await.unwrap();
    drain(&bridge).await;

    assert!(server.received_requests().await.unwrap().is_empty());

    // The event itself was still bridgeable.
    let stats = store.stats().await.unwrap();
    assert!(stats.last_event_at.is_some());
}

#[tokio::test]
async fn test_subscriber_probes_one_endpoint_directly() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::header(EVENT_TYPE_HEADER, TEST_EVENT_TYPE))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (bridge, _store) = bridge_with(Arc::new(NoOpPublisher::new())).await;

    // Patterns that would never match the probe type: the probe bypasses
    // routing and targets the subscriber directly.
    let (view, _) = bridge
        .create_subscriber(
            &format!("{}/hook", server.uri()),
            vec!["integration_never_emitted".to_string()],
        )
        .await
        .unwrap();

    assert!(bridge.test_subscriber(view.id).await.unwrap());
    drain(&bridge).await;

    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_subscriber_with_unknown_id_returns_false() {
    let (bridge, _store) = bridge_with(Arc::new(NoOpPublisher::new())).await;
    assert!(!bridge.test_subscriber(SubscriberId::new()).await.unwrap());
}

#[tokio::test]
async fn list_subscribers_strips_secrets() {
    let (bridge, _store) = bridge_with(Arc::new(NoOpPublisher::new())).await;

    let (_, secret) =
        bridge.create_subscriber("https://example.com/hook", Vec::new()).await.unwrap();
    assert_eq!(secret.len(), 64);

    let listed = bridge.list_subscribers().await.unwrap();
    assert_eq!(listed.len(), 1);

    let json = serde_json::to_value(&listed).unwrap();
    assert!(!json.to_string().contains(&secret));
}

#[tokio::test]
async fn status_reports_counts_stats_and_fanout() {
    let (bridge, _store) = bridge_with(Arc::new(NoOpPublisher::new())).await;

    let (first, _) =
        bridge.create_subscriber("https://example.com/a", Vec::new()).await.unwrap();
    bridge.create_subscriber("https://example.com/b", Vec::new()).await.unwrap();
    bridge.set_subscriber_enabled(first.id, false).await.unwrap().unwrap();

    let status = bridge.status().await.unwrap();
    assert_eq!(status.subscribers.total, 2);
    assert_eq!(status.subscribers.enabled, 1);
    assert_eq!(status.pending_deliveries, 0);
    assert_eq!(status.stats.delivered, 0);
    assert_eq!(status.fanout, json!({"enabled": false}));
}

#[tokio::test]
async fn burst_of_events_fans_out_concurrently() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (bridge, store) = bridge_with(Arc::new(NoOpPublisher::new())).await;
    for i in 0..3 {
        bridge
            .create_subscriber(&format!("{}/hook/{i}", server.uri()), vec!["*".to_string()])
            .await
            .unwrap();
    }

    for i in 0..5 {
        bridge
            .emit(BridgeEvent::new("integration_task_completed", json!({"seq": i})))
            .await
            .unwrap();
    }
    drain(&bridge).await;

    // 5 events x 3 subscribers, every sequence terminal, none lost.
    assert_eq!(server.received_requests().await.unwrap().len(), 15);
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.delivered, 15);
    assert_eq!(stats.failed, 0);
    assert_eq!(bridge.pending_deliveries(), 0);
}
