//! Background detection pipeline
//!
//! Resolve → detect → extract → persist, with scratch cleanup on every path.
//! Failures are logged here and never reach the HTTP caller.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::detection::DetectionModel;
use crate::error::{DetectionError, ExtractionError, PipelineError};
use crate::extract::{extract, DetectedObjectSet, Extraction};
use crate::scratch::ScratchDir;
use crate::storage::{DocumentStore, UpsertOutcome};
use crate::video::VideoResolver;

/// What happened to the object set at the storage step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Nothing detected, nothing written
    Skipped,
    Created,
    Updated,
    /// Store error, logged and swallowed
    Failed(String),
}

/// Summary of one completed run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub user_id: String,
    pub video_url: String,
    pub frames: usize,
    pub detections: usize,
    pub objects: DetectedObjectSet,
    pub truncated: Option<ExtractionError>,
    pub persistence: PersistOutcome,
    pub elapsed: Duration,
}

pub struct DetectionPipeline {
    resolver: VideoResolver,
    model: Arc<dyn DetectionModel>,
    store: Arc<dyn DocumentStore>,
    scratch_root: PathBuf,
}

impl DetectionPipeline {
    pub fn new(
        resolver: VideoResolver,
        model: Arc<dyn DetectionModel>,
        store: Arc<dyn DocumentStore>,
        scratch_root: PathBuf,
    ) -> Self {
        Self {
            resolver,
            model,
            store,
            scratch_root,
        }
    }

    /// Run in a detached task; dropping the handle does not cancel the run
    pub fn spawn(
        self: Arc<Self>,
        user_id: String,
        video_url: String,
    ) -> JoinHandle<Result<PipelineReport, PipelineError>> {
        tokio::spawn(async move { self.run(&user_id, &video_url).await })
    }

    /// Run in a detached task whose failure to complete, such as a panic, is
    /// logged instead of dropped with the handle
    pub fn spawn_detached(self: Arc<Self>, user_id: String, video_url: String) -> JoinHandle<()> {
        let run = self.spawn(user_id.clone(), video_url);
        tokio::spawn(async move {
            if let Err(e) = run.await {
                error!("Detection task for UserID {} did not complete: {}", user_id, e);
            }
        })
    }

    /// Process one video end to end. The run's scratch directory is always
    /// cleaned up, whatever the outcome.
    pub async fn run(&self, user_id: &str, video_url: &str) -> Result<PipelineReport, PipelineError> {
        let scratch = ScratchDir::for_run(&self.scratch_root);

        let result = self.process(user_id, video_url, &scratch).await;
        if let Err(e) = &result {
            error!("Error processing detection for UserID {}: {}", user_id, e);
        }

        if let Err(e) = scratch.cleanup().await {
            error!("Error during cleanup: {}", e);
        }

        result
    }

    async fn process(
        &self,
        user_id: &str,
        video_url: &str,
        scratch: &ScratchDir,
    ) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();

        let video_path = self.resolver.resolve(video_url, scratch).await?;
        let extraction = self.detect(video_path).await?;
        if let Some(reason) = &extraction.truncated {
            warn!(
                "Extraction for UserID {} stopped early, keeping {} detections: {}",
                user_id,
                extraction.detections.len(),
                reason
            );
        }

        let objects = extraction.object_set();
        let persistence = if objects.is_empty() {
            info!("No objects detected for UserID: {}", user_id);
            PersistOutcome::Skipped
        } else {
            info!("UserID: {}, Detected Objects: {}", user_id, objects);
            self.persist(user_id, video_url, &objects).await
        };

        let elapsed = start.elapsed();
        info!(
            "🎉 Processed {} for UserID {} in {:.2}s ({} frames, {} detections)",
            video_url,
            user_id,
            elapsed.as_secs_f64(),
            extraction.frames,
            extraction.detections.len()
        );

        Ok(PipelineReport {
            user_id: user_id.to_string(),
            video_url: video_url.to_string(),
            frames: extraction.frames,
            detections: extraction.detections.len(),
            objects,
            truncated: extraction.truncated,
            persistence,
            elapsed,
        })
    }

    /// Stream the video through the model on the blocking pool
    async fn detect(&self, video_path: PathBuf) -> Result<Extraction, DetectionError> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let frames = model.stream(&video_path)?;
            extract(frames, model.labels())
        })
        .await
        .map_err(|e| DetectionError::Aborted(e.to_string()))?
    }

    async fn persist(
        &self,
        user_id: &str,
        video_url: &str,
        objects: &DetectedObjectSet,
    ) -> PersistOutcome {
        match self
            .store
            .append_detected_items(user_id, video_url, &objects.to_vec())
            .await
        {
            Ok(UpsertOutcome::Created) => {
                info!("No matching document found to update, a new document was created.");
                PersistOutcome::Created
            }
            Ok(UpsertOutcome::Updated) => {
                info!("Document updated successfully.");
                PersistOutcome::Updated
            }
            Err(e) => {
                error!("Error updating in document store: {}", e);
                PersistOutcome::Failed(e.to_string())
            }
        }
    }
}
