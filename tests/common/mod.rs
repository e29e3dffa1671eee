#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use video_detector::detection::{DetectionModel, FrameStream};
use video_detector::storage::DocumentStore;
use video_detector::{
    DetectionError, DetectionPipeline, FrameResult, MemoryStore, RawBox, StorageError,
    UpsertOutcome, VideoResolver,
};

/// What the fake model saw when it was asked to stream a video
#[derive(Debug, Clone)]
pub struct StreamCall {
    pub path: PathBuf,
    pub existed: bool,
}

/// Blocks `stream` until opened
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.signal.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap();
        while !*open {
            open = self.signal.wait(open).unwrap();
        }
    }
}

/// Scripted detector returning the same frames for every video
pub struct FakeModel {
    labels: Vec<String>,
    frames: Vec<FrameResult>,
    calls: Mutex<Vec<StreamCall>>,
    gate: Option<Arc<Gate>>,
}

impl FakeModel {
    pub fn new(frames: Vec<FrameResult>) -> Self {
        Self {
            labels: vec!["person".to_string(), "barbell".to_string(), "bench".to_string()],
            frames,
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![FrameResult { index: 0, boxes: vec![] }, FrameResult { index: 1, boxes: vec![] }])
    }

    /// `count` frames each containing one person
    pub fn people(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|index| FrameResult {
                    index,
                    boxes: vec![RawBox::new([10.0, 20.0, 110.0, 220.0], 0.91, 0)],
                })
                .collect(),
        )
    }

    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<StreamCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl DetectionModel for FakeModel {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn stream(&self, path: &Path) -> Result<FrameStream<'_>, DetectionError> {
        self.calls.lock().unwrap().push(StreamCall {
            path: path.to_path_buf(),
            existed: path.exists(),
        });

        if let Some(gate) = &self.gate {
            gate.wait();
        }

        Ok(Box::new(
            self.frames
                .clone()
                .into_iter()
                .map(Ok::<FrameResult, DetectionError>),
        ))
    }
}

/// Store that always fails
pub struct FailingStore;

#[async_trait]
impl DocumentStore for FailingStore {
    async fn append_detected_items(
        &self,
        _user_id: &str,
        _video_url: &str,
        _items: &[String],
    ) -> Result<UpsertOutcome, StorageError> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
}

/// Store that panics inside the async part of a run
pub struct PanickingStore;

#[async_trait]
impl DocumentStore for PanickingStore {
    async fn append_detected_items(
        &self,
        _user_id: &str,
        _video_url: &str,
        _items: &[String],
    ) -> Result<UpsertOutcome, StorageError> {
        panic!("store driver bug");
    }
}

pub fn pipeline(
    model: Arc<FakeModel>,
    store: Arc<dyn DocumentStore>,
    scratch_root: PathBuf,
) -> DetectionPipeline {
    let resolver = VideoResolver::new(Duration::from_secs(5)).unwrap();
    DetectionPipeline::new(resolver, model, store, scratch_root)
}

/// Poll the store until the document shows up
pub async fn wait_for_items(store: &MemoryStore, user_id: &str, video_url: &str) -> Option<Vec<String>> {
    for _ in 0..100 {
        if let Some(doc) = store.find(user_id, video_url).await {
            return Some(doc.detected_items);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
