//! Class label tables

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::DetectionError;

/// COCO class names (80 classes).
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

pub fn coco_labels() -> Vec<String> {
    COCO_CLASSES.iter().map(|s| s.to_string()).collect()
}

/// Read a label file with one class name per line; blank lines are skipped
pub fn load_labels_file(path: &Path) -> Result<Vec<String>, DetectionError> {
    let content = std::fs::read_to_string(path)?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(DetectionError::ModelLoad(format!(
            "Label file {} is empty",
            path.display()
        )));
    }
    Ok(labels)
}

/// Parse the `names` metadata written into exported models,
/// e.g. `{0: 'person', 1: 'bicycle'}`.
///
/// Missing indices are filled with `class_<n>` so the table stays positional.
pub fn parse_names_metadata(raw: &str) -> Option<Vec<String>> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut names = BTreeMap::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let index: usize = rest[..colon].trim().parse().ok()?;
        rest = rest[colon + 1..].trim_start();

        let quote = rest.chars().next()?;
        if quote != '\'' && quote != '"' {
            return None;
        }
        let close = rest[1..].find(quote)? + 1;
        names.insert(index, rest[1..close].to_string());

        rest = rest[close + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    let len = names.keys().next_back().map(|last| last + 1)?;
    Some(
        (0..len)
            .map(|i| names.remove(&i).unwrap_or_else(|| format!("class_{}", i)))
            .collect(),
    )
}
