use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::{middleware as axum_mw, Router};
use serde_json::Value;

use recon_api::config::Config;
use recon_api::middleware::tracking;
use recon_api::track::debug;
use recon_api::AppState;

/// Wire the real instrumentation middleware and debug endpoint around a
/// deliberately slow route, served over a real listener.
async fn serve_test_app(handler_delay: Duration) -> String {
    let state = Arc::new(AppState::new(Config::from_env()));

    let app = Router::new()
        .route("/api/debug", get(debug::debug_handler))
        .route(
            "/api/slow",
            get(move || async move {
                tokio::time::sleep(handler_delay).await;
                "done"
            }),
        )
        .with_state(state.clone())
        .layer(axum_mw::from_fn_with_state(state, tracking::track_requests));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

async fn fetch_debug(client: &reqwest::Client, base: &str) -> (u16, Vec<Value>) {
    let response = client.get(format!("{base}/api/debug")).send().await.unwrap();
    let status = response.status().as_u16();
    let entries: Vec<Value> = response.json().await.unwrap();
    (status, entries)
}

#[tokio::test]
async fn debug_endpoint_tracks_a_request_through_its_lifecycle() {
    let delay = Duration::from_millis(500);
    let base = serve_test_app(delay).await;
    let client = reqwest::Client::new();

    // Idle server: empty array, status 200.
    let (status, entries) = fetch_debug(&client, &base).await;
    assert_eq!(status, 200);
    assert!(entries.is_empty());

    // Kick off the slow request and probe the debug endpoint mid-flight.
    let slow = {
        let client = client.clone();
        let base = base.clone();
        tokio::spawn(async move { client.get(format!("{base}/api/slow")).send().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, entries) = fetch_debug(&client, &base).await;
    assert_eq!(status, 200);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["path"], "GET /api/slow");

    let nanos = entries[0]["duration"].as_u64().unwrap();
    assert!(nanos > 0);
    assert!(nanos < delay.as_nanos() as u64);

    // Once the slow request completes the registry is empty again.
    let response = slow.await.unwrap().unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let (status, entries) = fetch_debug(&client, &base).await;
    assert_eq!(status, 200);
    assert!(entries.is_empty());
}

#[tokio::test]
async fn debug_endpoint_never_reports_itself_after_completion() {
    let base = serve_test_app(Duration::from_millis(10)).await;
    let client = reqwest::Client::new();

    // The debug request is itself tracked while in flight, but must be
    // deregistered by the time the next snapshot is taken.
    for _ in 0..3 {
        let (_, entries) = fetch_debug(&client, &base).await;
        assert!(entries.is_empty());
    }
}
