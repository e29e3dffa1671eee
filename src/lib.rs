//! Video Detector
//!
//! Accepts a video reference over HTTP, runs an object detector over every
//! frame in the background and records the distinct object classes against
//! the user's video document.

pub mod api;
pub mod config;
pub mod detection;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod scratch;
pub mod storage;
pub mod video;

// Re-export main types for easy access
pub use crate::api::{ApiServer, AppState, VideoRequest};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::detection::{DetectionModel, FrameResult, RawBox, YoloModel};
pub use crate::error::{DetectionError, ExtractionError, PipelineError, ResolveError, StorageError};
pub use crate::extract::{DetectedObjectSet, Detection, Extraction};
pub use crate::pipeline::{DetectionPipeline, PersistOutcome, PipelineReport};
pub use crate::scratch::ScratchDir;
pub use crate::storage::{DocumentStore, MemoryStore, MongoStore, UpsertOutcome, VideoDocument};
pub use crate::video::VideoResolver;
