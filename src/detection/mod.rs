//! Detection runner
//!
//! A [`DetectionModel`] is loaded once at startup and turns a local video into
//! a lazy stream of per-frame results. The stream is finite and cannot be
//! restarted; callers consume it exactly once.

use std::path::Path;

use crate::error::DetectionError;

pub mod frames;
pub mod labels;
pub mod yolo;

pub use frames::{FrameReader, VideoDimensions};
pub use labels::COCO_CLASSES;
pub use yolo::YoloModel;

/// Number of values in a well-formed raw box row
pub const BOX_FIELDS: usize = 6;

/// One raw detection row: `[x1, y1, x2, y2, confidence, class_index]`
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
    pub values: Vec<f32>,
}

impl RawBox {
    pub fn new(coordinates: [f32; 4], confidence: f32, class_index: usize) -> Self {
        let [x1, y1, x2, y2] = coordinates;
        Self {
            values: vec![x1, y1, x2, y2, confidence, class_index as f32],
        }
    }
}

/// Model output for a single decoded frame
#[derive(Debug, Clone, Default)]
pub struct FrameResult {
    /// Zero-based frame position in the video
    pub index: usize,
    pub boxes: Vec<RawBox>,
}

/// Lazy sequence of frame results
pub type FrameStream<'a> = Box<dyn Iterator<Item = Result<FrameResult, DetectionError>> + Send + 'a>;

/// Pre-loaded object detector
pub trait DetectionModel: Send + Sync {
    /// Class index to label table
    fn labels(&self) -> &[String];

    /// Start streaming results for the video at `path`
    fn stream(&self, path: &Path) -> Result<FrameStream<'_>, DetectionError>;
}
