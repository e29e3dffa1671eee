//! Persistence of detected object labels per (user, video)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Stored record for one user's video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDocument {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "videoUrl")]
    pub video_url: String,

    /// Appended on every processing run, duplicates included
    #[serde(default)]
    pub detected_items: Vec<String>,
}

/// Which side of the upsert was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Append `items` to the document keyed by (user_id, video_url), creating it if absent
    async fn append_detected_items(
        &self,
        user_id: &str,
        video_url: &str,
        items: &[String],
    ) -> Result<UpsertOutcome, StorageError>;
}
