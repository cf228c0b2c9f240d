use super::*;
use crate::Config;
use crate::batch::test_helpers::{MockProvider, create_test_coordinator, identifiers};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use std::time::Duration;
use tower::ServiceExt;


/// Coordinator over a succeeding mock provider, wrapped in Arc
async fn create_test_app(
    configure: impl FnOnce(&mut Config),
) -> (Arc<BatchCoordinator>, tempfile::TempDir) {
    let provider = Arc::new(MockProvider::succeeding());
    let (coordinator, temp_dir) = create_test_coordinator(provider, configure).await;
    (Arc::new(coordinator), temp_dir)
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (coordinator, _temp_dir) = create_test_app(|config| {
        // Port 0 = OS assigns a free port
        config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    })
    .await;

    let api_handle = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { start_api_server(coordinator).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be serving");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (coordinator, _temp_dir) = create_test_app(|config| {
        config.api.cors_enabled = true;
        config.api.cors_origins = vec!["*".to_string()];
    })
    .await;
    let app = create_router(coordinator);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (coordinator, _temp_dir) = create_test_app(|config| {
        config.api.cors_enabled = false;
    })
    .await;
    let app = create_router(coordinator);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
