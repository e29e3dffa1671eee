use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentStore, UpsertOutcome, VideoDocument};
use crate::error::StorageError;

/// Process-local document store with the same upsert semantics as MongoDB
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<VideoDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find(&self, user_id: &str, video_url: &str) -> Option<VideoDocument> {
        self.documents
            .read()
            .await
            .iter()
            .find(|doc| doc.user_id == user_id && doc.video_url == video_url)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn append_detected_items(
        &self,
        user_id: &str,
        video_url: &str,
        items: &[String],
    ) -> Result<UpsertOutcome, StorageError> {
        let mut documents = self.documents.write().await;

        if let Some(doc) = documents
            .iter_mut()
            .find(|doc| doc.user_id == user_id && doc.video_url == video_url)
        {
            doc.detected_items.extend_from_slice(items);
            return Ok(UpsertOutcome::Updated);
        }

        documents.push(VideoDocument {
            user_id: user_id.to_string(),
            video_url: video_url.to_string(),
            detected_items: items.to_vec(),
        });
        Ok(UpsertOutcome::Created)
    }
}
