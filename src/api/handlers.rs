//! API request handlers

use serde_json::Value;
use tracing::info;

use super::models::{AckResponse, VideoRequest};
use super::server::AppState;

/// Handle root greeting requests
pub fn greeting() -> Value {
    serde_json::json!({ "message": "Hello, World!" })
}

/// Record the request and start the detection pipeline without waiting for it
pub async fn schedule_processing(state: &AppState, request: VideoRequest) -> AckResponse {
    info!(
        "📥 Scheduling detection for UserID {} on {}",
        request.user_id, request.video_url
    );

    state.record_request(request.clone()).await;

    // The run reports through logs only
    state
        .pipeline
        .clone()
        .spawn_detached(request.user_id, request.video_url);

    AckResponse::scheduled()
}
