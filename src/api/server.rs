//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::handlers;
use super::models::{ErrorResponse, VideoRequest};
use crate::pipeline::DetectionPipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
    latest_request: Arc<RwLock<Option<VideoRequest>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<DetectionPipeline>) -> Self {
        Self {
            pipeline,
            latest_request: Arc::new(RwLock::new(None)),
        }
    }

    /// Most recently accepted request, if any
    pub async fn latest_request(&self) -> Option<VideoRequest> {
        self.latest_request.read().await.clone()
    }

    pub(crate) async fn record_request(&self, request: VideoRequest) {
        *self.latest_request.write().await = Some(request);
    }
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(root_handler))
        .route("/process-video/", post(process_video_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    info!("🌐 API server listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Root greeting handler
async fn root_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(handlers::greeting()))
}

/// Process video handler
async fn process_video_handler(
    State(state): State<AppState>,
    payload: Result<Json<VideoRequest>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(request)) => {
            let ack = handlers::schedule_processing(&state, request).await;
            (StatusCode::OK, Json(ack)).into_response()
        }
        Err(rejection) => {
            warn!("Rejected process-video payload: {}", rejection.body_text());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::processing_failed()),
            )
                .into_response()
        }
    }
}
