use async_trait::async_trait;
use mongodb::bson::{doc, Document};
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Collection};
use tracing::{error, info};

use super::{DocumentStore, UpsertOutcome, VideoDocument};
use crate::config::StorageConfig;
use crate::error::StorageError;

/// MongoDB-backed store, one document per (userId, videoUrl)
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    collection: Collection<VideoDocument>,
}

impl MongoStore {
    /// Build a client on Stable API v1. No connection is made until first use.
    pub async fn connect(config: &StorageConfig) -> Result<Self, StorageError> {
        let uri = config
            .uri
            .as_deref()
            .ok_or_else(|| StorageError::Unavailable("MONGODB_URI is not set".to_string()))?;

        let mut options = ClientOptions::parse(uri).await?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .build(),
        );

        let client = Client::with_options(options)?;
        let collection = client
            .database(&config.database)
            .collection::<VideoDocument>(&config.collection);

        Ok(Self { client, collection })
    }

    /// Round-trip to the deployment; failures are logged, not fatal
    pub async fn ping(&self) -> bool {
        match self
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
        {
            Ok(_) => {
                info!("✅ Pinged your deployment. You successfully connected to MongoDB!");
                true
            }
            Err(e) => {
                error!("Error while connecting to MongoDB: {}", e);
                false
            }
        }
    }
}

/// Filter matching both key fields
pub fn key_filter(user_id: &str, video_url: &str) -> Document {
    doc! {
        "$and": [
            { "userId": user_id },
            { "videoUrl": video_url },
        ]
    }
}

/// Push every item onto `detected_items`
pub fn append_update(items: &[String]) -> Document {
    let items = items.to_vec();
    doc! {
        "$push": { "detected_items": { "$each": items } }
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn append_detected_items(
        &self,
        user_id: &str,
        video_url: &str,
        items: &[String],
    ) -> Result<UpsertOutcome, StorageError> {
        let result = self
            .collection
            .update_one(key_filter(user_id, video_url), append_update(items))
            .upsert(true)
            .await?;

        if result.matched_count == 0 {
            Ok(UpsertOutcome::Created)
        } else {
            Ok(UpsertOutcome::Updated)
        }
    }
}
