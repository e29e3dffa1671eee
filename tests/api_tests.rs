mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use common::{pipeline, wait_for_items, FakeModel, Gate, PanickingStore};
use video_detector::api::{create_router, AppState};
use video_detector::{MemoryStore, VideoRequest};

fn app(model: FakeModel, store: Arc<MemoryStore>, temp_dir: &TempDir) -> (Router, AppState) {
    let pipeline = Arc::new(pipeline(Arc::new(model), store, temp_dir.path().join("temp")));
    let state = AppState::new(pipeline);
    (create_router(state.clone()), state)
}

fn post_json(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/process-video/")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_root_greeting() {
    let temp_dir = TempDir::new().unwrap();
    let (router, _) = app(FakeModel::empty(), Arc::new(MemoryStore::new()), &temp_dir);

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"message": "Hello, World!"}));
}

#[tokio::test]
async fn test_acknowledges_before_pipeline_finishes() {
    let temp_dir = TempDir::new().unwrap();
    let gate = Arc::new(Gate::default());
    let store = Arc::new(MemoryStore::new());
    let (router, _) = app(
        FakeModel::people(4).with_gate(gate.clone()),
        store.clone(),
        &temp_dir,
    );

    let response = router
        .oneshot(post_json(
            json!({"userId": "u1", "videoUrl": "gym.mp4"}).to_string(),
        ))
        .await
        .unwrap();

    // The model is still blocked, so nothing can have been written yet
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"status": "ok", "message": "Video processed successfully"})
    );
    assert!(store.is_empty().await);

    gate.open();
    let items = wait_for_items(&store, "u1", "gym.mp4").await;
    assert_eq!(items, Some(vec!["person".to_string()]));
}

#[tokio::test]
async fn test_latest_request_is_recorded() {
    let temp_dir = TempDir::new().unwrap();
    let (router, state) = app(FakeModel::empty(), Arc::new(MemoryStore::new()), &temp_dir);

    assert!(state.latest_request().await.is_none());

    for video in ["a.mp4", "b.mp4"] {
        let response = router
            .clone()
            .oneshot(post_json(
                json!({"userId": "u7", "videoUrl": video}).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(
        state.latest_request().await,
        Some(VideoRequest {
            user_id: "u7".to_string(),
            video_url: "b.mp4".to_string(),
        })
    );
}

#[tokio::test]
async fn test_invalid_payloads_get_generic_error() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::new());
    let (router, state) = app(FakeModel::people(1), store.clone(), &temp_dir);

    let payloads = [
        json!({"userId": "u1"}).to_string(),
        json!({"userId": 42, "videoUrl": "gym.mp4"}).to_string(),
        "not json".to_string(),
    ];

    for payload in payloads {
        let response = router.clone().oneshot(post_json(payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "An error occurred while processing the video"})
        );
    }

    assert!(state.latest_request().await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_missing_content_type_gets_generic_error() {
    let temp_dir = TempDir::new().unwrap();
    let (router, _) = app(FakeModel::empty(), Arc::new(MemoryStore::new()), &temp_dir);

    let request = Request::builder()
        .method("POST")
        .uri("/process-video/")
        .body(Body::from(json!({"userId": "u1", "videoUrl": "a.mp4"}).to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_panicking_run_does_not_affect_later_requests() {
    let temp_dir = TempDir::new().unwrap();
    let pipeline = Arc::new(pipeline(
        Arc::new(FakeModel::people(1)),
        Arc::new(PanickingStore),
        temp_dir.path().join("temp"),
    ));
    let router = create_router(AppState::new(pipeline));

    for video in ["a.mp4", "b.mp4"] {
        let response = router
            .clone()
            .oneshot(post_json(
                json!({"userId": "u1", "videoUrl": video}).to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    let response = router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
