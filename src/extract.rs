//! Converts raw frame results into detections and the per-video object set

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

use crate::detection::{FrameResult, BOX_FIELDS};
use crate::error::{DetectionError, ExtractionError};

/// One object instance found in one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    pub confidence: f32,
    /// Box corners `x1, y1, x2, y2` in source pixels
    pub coordinates: [f32; 4],
}

/// All detections collected from one video
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Frame order, then box order within a frame
    pub detections: Vec<Detection>,
    pub frames: usize,
    /// Set when extraction stopped early on bad box data
    pub truncated: Option<ExtractionError>,
}

impl Extraction {
    pub fn object_set(&self) -> DetectedObjectSet {
        DetectedObjectSet::from_detections(&self.detections)
    }
}

/// Distinct class labels seen across a video
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectedObjectSet(BTreeSet<String>);

impl DetectedObjectSet {
    pub fn from_detections(detections: &[Detection]) -> Self {
        Self(detections.iter().map(|d| d.class.clone()).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl std::fmt::Display for DetectedObjectSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, label) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", label)?;
        }
        write!(f, "}}")
    }
}

/// Consume a frame stream and build detection records.
///
/// Bad box data stops extraction and keeps what was collected so far. Errors
/// from the stream itself are returned as is.
pub fn extract<I>(frames: I, labels: &[String]) -> Result<Extraction, DetectionError>
where
    I: IntoIterator<Item = Result<FrameResult, DetectionError>>,
{
    let mut extraction = Extraction::default();

    for frame in frames {
        let frame = frame?;
        extraction.frames += 1;

        for (box_index, raw) in frame.boxes.iter().enumerate() {
            match to_detection(&raw.values, labels, frame.index, box_index) {
                Ok(detection) => extraction.detections.push(detection),
                Err(e) => {
                    warn!("Error extracting box data: {}", e);
                    extraction.truncated = Some(e);
                    return Ok(extraction);
                }
            }
        }
    }

    Ok(extraction)
}

fn to_detection(
    values: &[f32],
    labels: &[String],
    frame: usize,
    box_index: usize,
) -> Result<Detection, ExtractionError> {
    if values.len() < BOX_FIELDS {
        return Err(ExtractionError::MalformedBox {
            frame,
            box_index,
            len: values.len(),
        });
    }

    let class_index = values[5];
    let class = (class_index.is_finite() && class_index >= 0.0)
        .then(|| labels.get(class_index as usize))
        .flatten()
        .ok_or(ExtractionError::UnknownClass {
            frame,
            class_index,
            labels: labels.len(),
        })?;

    Ok(Detection {
        class: class.clone(),
        confidence: values[4],
        coordinates: [values[0], values[1], values[2], values[3]],
    })
}
