use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::ResolveError;
use crate::scratch::ScratchDir;

/// File name used when a URL has no trailing path segment
const FALLBACK_FILE_NAME: &str = "video";

/// Turns a video reference into a file on local disk
#[derive(Clone)]
pub struct VideoResolver {
    client: reqwest::Client,
}

impl VideoResolver {
    pub fn new(timeout: Duration) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Whether the reference must be downloaded before processing
    pub fn is_remote(reference: &str) -> bool {
        reference.starts_with("http")
    }

    /// Resolve a reference to a local path.
    ///
    /// Remote references are downloaded into `scratch`, which is created on
    /// demand. Anything else is taken to be a local path and returned as is.
    pub async fn resolve(
        &self,
        reference: &str,
        scratch: &ScratchDir,
    ) -> Result<PathBuf, ResolveError> {
        if !Self::is_remote(reference) {
            debug!("Using local video path: {}", reference);
            return Ok(PathBuf::from(reference));
        }

        let url = Url::parse(reference).map_err(|e| ResolveError::InvalidUrl {
            url: reference.to_string(),
            reason: e.to_string(),
        })?;
        let file_name = file_name_for(&url);

        let dir = scratch.ensure().await?;
        let video_path = dir.join(file_name);

        info!("⬇️ Downloading video: {}", reference);
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Status {
                url: reference.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(&video_path).await?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        info!(
            "✅ Downloaded {} bytes to {}",
            written,
            video_path.display()
        );
        Ok(video_path)
    }
}

/// Trailing path segment of the URL, ignoring query and fragment
pub fn file_name_for(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string()
}
