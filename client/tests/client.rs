//! End-to-end tests against a mocked backend: commands over HTTP, results
//! over a mocked server-push stream.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use catalyst_client::{CatalystClient, Error};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_CONTENT_TYPE: &str = "text/event-stream";

fn client_for(server: &MockServer) -> CatalystClient {
    CatalystClient::builder(&server.uri())
        .expect("mock server uri parses")
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client builds")
}

/// Mount the keep-alive endpoint; pings run until the stream connects.
async fn mount_ping(server: &MockServer) {
    Mock::given(method("HEAD"))
        .and(path("/v0"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

async fn mount_stream(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), STREAM_CONTENT_TYPE),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn command_resolves_with_the_correlated_stream_event() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("POST"))
        .and(path("/v0/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reqId": "r-42"})))
        .mount(&server)
        .await;

    // Heartbeat first, then the answer for r-42.
    let body = concat!(
        "event: \n",
        "data: pong\n",
        "\n",
        "event: datasources\n",
        "data: {\"reqId\":\"r-42\",\"total\":1,\"types\":[],\"data\":",
        "[{\"id\":5,\"type\":1,\"name\":\"sample\",\"createdAt\":\"2024-01-01T00:00:00Z\"}]}\n",
        "\n",
    );
    mount_stream(&server, body).await;

    let client = client_for(&server);
    let created = tokio::time::timeout(
        Duration::from_secs(10),
        client.datasources().create("content", None, Some("sample")),
    )
    .await
    .expect("correlation completes")
    .expect("create succeeds")
    .expect("an entity was produced");

    assert_eq!(created.id, 5);
    assert_eq!(created.name, "sample");
    assert!(created.created_at.is_some());
    client.close();
}

#[tokio::test]
async fn error_event_surfaces_as_domain_error() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    Mock::given(method("POST"))
        .and(path("/v0/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reqId": "r-bad"})))
        .mount(&server)
        .await;

    let body = concat!(
        "event: errors\n",
        "data: {\"reqId\":\"r-bad\",\"data\":[{\"status\":404,\"error\":\"no such entity\"}]}\n",
        "\n",
    );
    mount_stream(&server, body).await;

    let client = client_for(&server);
    let result = tokio::time::timeout(
        Duration::from_secs(10),
        client.datasources().create("content", None, None),
    )
    .await
    .expect("correlation completes");

    match result {
        Err(Error::NotFound { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such entity");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    client.close();
}

#[tokio::test]
async fn unauthorized_request_is_retried_after_reauthentication() {
    let server = MockServer::start().await;

    // First call is rejected, the retry after the auth cycle succeeds.
    Mock::given(method("GET"))
        .and(path("/v0/auth"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/auth"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 12, "email": "user@example.org"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let user = client.auth().whoami().await.expect("retry succeeds");
    assert_eq!(user.id, 12);
    assert_eq!(user.email.as_deref(), Some("user@example.org"));
    client.close();
}

#[tokio::test]
async fn data_source_content_is_fetched_directly() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/datasources/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": "raw body"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let content = client
        .datasources()
        .get_content(7)
        .await
        .expect("content fetch succeeds");
    assert_eq!(content.content, "raw body");
    client.close();
}

#[tokio::test]
async fn http_status_maps_to_the_error_taxonomy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v0/auth"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    match client.auth().whoami().await {
        Err(Error::NotFound { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "not found");
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    client.close();
}

#[tokio::test]
async fn terminal_stream_failure_cancels_waiting_calls() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    // The stream endpoint rejects outright: not transient, no reconnect.
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"reqId": "r-1"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::time::timeout(Duration::from_secs(5), client.datasources().list())
        .await
        .expect("call terminates instead of hanging");

    assert!(matches!(result, Err(Error::Cancelled)));
    client.close();
}

#[tokio::test]
async fn resubscribe_racing_the_idle_shutdown_still_reconnects() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    let body = concat!("event: \n", "data: pong\n", "\n", "event: \n", "data: pong\n", "\n",);
    mount_stream(&server, body).await;

    let client = client_for(&server);

    // Drop the only subscriber and immediately open a new one: whichever way
    // this interleaves with the stream task's own shutdown check, the new
    // subscriber must still be served.
    let mut first = client.subscribe(None);
    tokio::time::timeout(Duration::from_secs(10), first.next())
        .await
        .expect("first stream connection delivers")
        .expect("a heartbeat arrives");
    drop(first);

    let mut second = client.subscribe(None);
    tokio::time::timeout(Duration::from_secs(10), second.next())
        .await
        .expect("stream serves the racing subscriber")
        .expect("a heartbeat arrives");
    client.close();
}

#[tokio::test]
async fn stream_closes_when_idle_and_reopens_for_a_new_subscriber() {
    let server = MockServer::start().await;
    mount_ping(&server).await;

    // One heartbeat, then a record that triggers the idle check.
    let body = concat!(
        "event: \n",
        "data: pong\n",
        "\n",
        "event: \n",
        "data: pong\n",
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body.as_bytes().to_vec(), STREAM_CONTENT_TYPE)
                .set_delay(Duration::from_millis(50)),
        )
        .expect(2..)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let mut first = client.subscribe(None);
    tokio::time::timeout(Duration::from_secs(10), first.next())
        .await
        .expect("first stream connection delivers")
        .expect("a heartbeat arrives");
    // Last subscriber gone: the next record shuts the stream down.
    drop(first);

    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut second = client.subscribe(None);
    tokio::time::timeout(Duration::from_secs(10), second.next())
        .await
        .expect("stream reopened for the new subscriber")
        .expect("a heartbeat arrives");

    client.close();
    // MockServer::verify on drop asserts the stream endpoint was hit twice.
}
