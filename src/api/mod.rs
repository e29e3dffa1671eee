//! API module for the video detector
//!
//! Accepts detection requests over HTTP and hands them to the background
//! pipeline.

use anyhow::Result;
use tracing::info;

pub mod handlers;
pub mod models;
pub mod server;

pub use models::{AckResponse, ErrorResponse, VideoRequest};
pub use server::{create_router, AppState};

/// API Server for handling REST requests
pub struct ApiServer {
    state: AppState,
    host: String,
    port: u16,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(state: AppState, host: String, port: u16) -> Self {
        Self { state, host, port }
    }

    /// Start the API server
    pub async fn start(self) -> Result<()> {
        info!("🚀 Starting API server on port {}", self.port);
        server::start_http_server(self.state, &self.host, self.port).await
    }
}
