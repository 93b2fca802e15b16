// Public URL resolution for input videos
//
// The Graph API pulls videos by URL rather than accepting a local upload
// here, so each video must be reachable on the public internet. Hosting is
// an external collaborator; this module only derives the URL.

use crate::config::MediaConfig;
use crate::errors::PublishError;
use crate::models::ContentItem;
use async_trait::async_trait;

/// Resolves a content item's video file to a publicly reachable URL
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn resolve(&self, item: &ContentItem) -> Result<String, PublishError>;
}

/// Joins a configured public base URL with the folder and file name; the
/// input directory is assumed to be served under that base URL.
pub struct StaticMediaHost {
    base_url: String,
}

impl StaticMediaHost {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl MediaHost for StaticMediaHost {
    async fn resolve(&self, item: &ContentItem) -> Result<String, PublishError> {
        let file_name = item
            .video_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| PublishError::MediaUrl(item.video_path.display().to_string()))?;

        Ok(format!("{}/{}/{}", self.base_url, item.folder_id, file_name))
    }
}
