//! YOLO detector running an ONNX export through ONNX Runtime.

use std::path::Path;
use std::sync::Mutex;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info, warn};

use super::frames::{FrameReader, VideoDimensions};
use super::labels::{coco_labels, load_labels_file, parse_names_metadata};
use super::{DetectionModel, FrameResult, FrameStream, RawBox};
use crate::config::ModelConfig;
use crate::error::DetectionError;

/// Candidate box in source-frame pixel coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }

    fn into_raw_box(self) -> RawBox {
        RawBox::new([self.x1, self.y1, self.x2, self.y2], self.confidence, self.class_id)
    }
}

/// Object detector backed by a YOLOv8-style ONNX model.
///
/// The session needs exclusive access per run, so concurrent pipelines take
/// turns on the mutex.
pub struct YoloModel {
    session: Mutex<Session>,
    labels: Vec<String>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl YoloModel {
    /// Load the model and its label table
    pub fn load(config: &ModelConfig) -> Result<Self, DetectionError> {
        if !config.model_path.exists() {
            return Err(DetectionError::ModelNotFound(config.model_path.clone()));
        }

        let session = Session::builder()
            .map_err(|e| DetectionError::ModelLoad(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DetectionError::ModelLoad(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| DetectionError::ModelLoad(format!("Failed to load ONNX model: {}", e)))?;

        let labels = match &config.labels_path {
            Some(path) => load_labels_file(path)?,
            None => embedded_labels(&session).unwrap_or_else(|| {
                warn!("Model carries no class names, falling back to COCO labels");
                coco_labels()
            }),
        };

        info!(
            "🧠 Detection model loaded from {} ({} classes, {}px input)",
            config.model_path.display(),
            labels.len(),
            config.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            labels,
            input_size: config.input_size,
            confidence_threshold: config.confidence_threshold,
            iou_threshold: config.iou_threshold,
        })
    }

    /// Run the model over one `rgb24` frame of `input_size`² pixels
    pub fn detect_frame(
        &self,
        frame: &[u8],
        source: VideoDimensions,
    ) -> Result<Vec<RawBox>, DetectionError> {
        let input = self.preprocess(frame)?;
        let (shape, output) = self.run_inference(input)?;
        let candidates = self.postprocess(&shape, &output, source)?;
        Ok(candidates.into_iter().map(Candidate::into_raw_box).collect())
    }

    fn preprocess(&self, frame: &[u8]) -> Result<Value, DetectionError> {
        let size = self.input_size as usize;
        let chw = to_chw(frame, size)?;

        let shape = vec![1usize, 3, size, size];
        Tensor::from_array((shape, chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| DetectionError::Inference(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> Result<(Vec<i64>, Vec<f32>), DetectionError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| DetectionError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| DetectionError::Inference(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| DetectionError::Inference("Missing output0 tensor".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectionError::Inference(format!("Failed to extract tensor: {}", e)))?;

        Ok((shape.iter().copied().collect(), data.to_vec()))
    }

    fn postprocess(
        &self,
        shape: &[i64],
        output: &[f32],
        source: VideoDimensions,
    ) -> Result<Vec<Candidate>, DetectionError> {
        decode_output(
            shape,
            output,
            self.input_size,
            source,
            self.confidence_threshold,
            self.iou_threshold,
        )
    }
}

impl DetectionModel for YoloModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn stream(&self, path: &Path) -> Result<FrameStream<'_>, DetectionError> {
        let source = VideoDimensions::probe(path)?;
        let reader = FrameReader::spawn(path, self.input_size)?;
        debug!(
            "Streaming {} ({}x{}) through detector",
            path.display(),
            source.width,
            source.height
        );

        Ok(Box::new(YoloFrames {
            model: self,
            reader,
            source,
            index: 0,
        }))
    }
}

struct YoloFrames<'a> {
    model: &'a YoloModel,
    reader: FrameReader,
    source: VideoDimensions,
    index: usize,
}

impl Iterator for YoloFrames<'_> {
    type Item = Result<FrameResult, DetectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let frame = match self.reader.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => return Some(Err(e)),
        };

        let index = self.index;
        self.index += 1;
        Some(
            self.model
                .detect_frame(&frame, self.source)
                .map(|boxes| FrameResult { index, boxes }),
        )
    }
}

/// HWC `rgb24` bytes of a `size`x`size` frame to a CHW buffer scaled to `[0, 1]`
pub fn to_chw(frame: &[u8], size: usize) -> Result<Vec<f32>, DetectionError> {
    let plane = size * size;
    if frame.len() != plane * 3 {
        return Err(DetectionError::Inference(format!(
            "Invalid frame length: expected {}, got {}",
            plane * 3,
            frame.len()
        )));
    }

    let mut chw = vec![0.0f32; plane * 3];
    for (pixel, rgb) in frame.chunks_exact(3).enumerate() {
        for c in 0..3 {
            chw[c * plane + pixel] = rgb[c] as f32 / 255.0;
        }
    }
    Ok(chw)
}

/// Decode a `[1, 4 + classes, candidates]` output into boxes in source pixels.
///
/// Each candidate keeps its best class. Candidates scoring below
/// `confidence_threshold`, or with no positive class score at all, are dropped
/// before class-wise NMS.
pub fn decode_output(
    shape: &[i64],
    output: &[f32],
    input_size: u32,
    source: VideoDimensions,
    confidence_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<Candidate>, DetectionError> {
    let (features, count) = match shape {
        [1, features, count] if *features > 4 && *count >= 0 => (*features as usize, *count as usize),
        _ => {
            return Err(DetectionError::Inference(format!(
                "Unexpected output shape {:?}",
                shape
            )))
        }
    };

    if output.len() != features * count {
        return Err(DetectionError::Inference(format!(
            "Unexpected output size: expected {}, got {}",
            features * count,
            output.len()
        )));
    }

    let at = |feature: usize, i: usize| output[feature * count + i];
    let scale_x = source.width as f32 / input_size as f32;
    let scale_y = source.height as f32 / input_size as f32;
    let (max_x, max_y) = (source.width as f32, source.height as f32);

    let mut candidates = Vec::new();
    for i in 0..count {
        let mut best_class = 0;
        let mut best_score = 0.0f32;
        for class in 0..features - 4 {
            let score = at(4 + class, i);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }

        if best_score <= 0.0 || best_score < confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        candidates.push(Candidate {
            x1: ((cx - w / 2.0) * scale_x).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * scale_y).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * scale_x).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * scale_y).clamp(0.0, max_y),
            confidence: best_score.min(1.0),
            class_id: best_class,
        });
    }

    Ok(non_maximum_suppression(candidates, iou_threshold))
}

/// Class names stored in the model's custom metadata, if any
fn embedded_labels(session: &Session) -> Option<Vec<String>> {
    let metadata = session.metadata().ok()?;
    let names = metadata.custom("names").ok()??;
    parse_names_metadata(&names)
}

/// Keep the highest-scoring box among same-class overlaps
pub fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.retain(|c| c.confidence.is_finite());
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }
    keep
}
