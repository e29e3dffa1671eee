//! Error types for each stage of the detection pipeline

use std::path::PathBuf;

/// Errors raised while turning a video reference into a local file
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Invalid video URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the detection model or its frame source
#[derive(thiserror::Error, Debug)]
pub enum DetectionError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Video decoding failed: {0}")]
    Decode(String),

    #[error("Detection task aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons extraction stops early; the detections collected so far are kept
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("Malformed box {box_index} in frame {frame}: expected 6 values, got {len}")]
    MalformedBox {
        frame: usize,
        box_index: usize,
        len: usize,
    },

    #[error("Unknown class index {class_index} in frame {frame} (label table has {labels} entries)")]
    UnknownClass {
        frame: usize,
        class_index: f32,
        labels: usize,
    },
}

/// Document store failures
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Scratch directory cleanup failures
#[derive(thiserror::Error, Debug)]
pub enum CleanupError {
    #[error("Failed to clean scratch directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration problems found at startup
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures that abort a pipeline run
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Video resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Detection failed: {0}")]
    Detection(#[from] DetectionError),
}
