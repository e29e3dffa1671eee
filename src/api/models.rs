//! API data models

use serde::{Deserialize, Serialize};

pub const ACK_MESSAGE: &str = "Video processed successfully";
pub const PROCESSING_ERROR_MESSAGE: &str = "An error occurred while processing the video";

/// Body of `POST /process-video/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRequest {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "videoUrl")]
    pub video_url: String,
}

/// Acknowledgment returned once processing is scheduled
#[derive(Debug, Serialize, Deserialize)]
pub struct AckResponse {
    pub status: String,
    pub message: String,
}

impl AckResponse {
    pub fn scheduled() -> Self {
        Self {
            status: "ok".to_string(),
            message: ACK_MESSAGE.to_string(),
        }
    }
}

/// Fixed error body, no detail about the cause
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ErrorResponse {
    pub fn processing_failed() -> Self {
        Self {
            detail: PROCESSING_ERROR_MESSAGE.to_string(),
        }
    }
}
