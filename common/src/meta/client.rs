// Meta Graph API client
//
// Instagram publishes through a two-step container flow (create, poll until
// processed, publish). Facebook reels use the three-phase resumable upload
// flow by file URL; feed videos are a single call. All calls authenticate
// with the page access token when one can be exchanged, otherwise the user
// token.

use crate::config::MetaConfig;
use crate::errors::PublishError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Instagram media container processing states we act on
const CONTAINER_FINISHED: &str = "FINISHED";
const CONTAINER_ERROR: &str = "ERROR";

pub struct MetaClient {
    client: Client,
    graph_base: String,
    upload_base: String,
    api_version: String,
    ig_account_id: String,
    fb_page_id: String,
    token: String,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl MetaClient {
    /// Build the client and exchange the user token for a page access token.
    /// A failed exchange falls back to the user token with a warning; the
    /// first real publish call will surface a hard credential problem.
    pub async fn connect(config: &MetaConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| PublishError::Http(e.to_string()))?;

        let mut meta = Self {
            client,
            graph_base: config.graph_base_url.trim_end_matches('/').to_string(),
            upload_base: config.upload_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            ig_account_id: config.ig_account_id.clone(),
            fb_page_id: config.fb_page_id.clone(),
            token: config.access_token.clone(),
            poll_interval: Duration::from_secs(config.container_poll_seconds),
            poll_attempts: config.container_poll_attempts,
        };

        if !meta.fb_page_id.is_empty() {
            match meta.fetch_page_token().await {
                Ok(Some(page_token)) => {
                    info!("Using page access token");
                    meta.token = page_token;
                }
                Ok(None) => {
                    warn!("No page access token in response, using user token");
                }
                Err(e) => {
                    warn!(error = %e, "Failed to exchange page access token, using user token");
                }
            }
        }

        Ok(meta)
    }

    fn graph_url(&self, path: &str) -> String {
        format!("{}/{}/{}", self.graph_base, self.api_version, path)
    }

    async fn fetch_page_token(&self) -> Result<Option<String>, PublishError> {
        let response = self
            .client
            .get(self.graph_url(&self.fb_page_id))
            .query(&[
                ("fields", "access_token"),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;

        let body = check_response(response).await?;
        Ok(body
            .get("access_token")
            .and_then(Value::as_str)
            .map(String::from))
    }

    // ── Instagram ───────────────────────────────────────────────────────

    /// Create a reel media container carrying the full caption
    #[instrument(skip(self, caption))]
    pub async fn create_reel_container(
        &self,
        video_url: &str,
        caption: &str,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/media", self.ig_account_id)))
            .query(&[
                ("media_type", "REELS"),
                ("video_url", video_url),
                ("caption", caption),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;

        let body = check_response(response).await?;
        let container_id = extract_id(&body)?;
        info!(container_id = %container_id, "Instagram reel container created");
        Ok(container_id)
    }

    /// Create a story media container. Stories carry no caption field; the
    /// title-derived reference stays in our logs and ledger only.
    #[instrument(skip(self))]
    pub async fn create_story_container(&self, video_url: &str) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/media", self.ig_account_id)))
            .query(&[
                ("media_type", "STORIES"),
                ("video_url", video_url),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;

        let body = check_response(response).await?;
        let container_id = extract_id(&body)?;
        info!(container_id = %container_id, "Instagram story container created");
        Ok(container_id)
    }

    /// Poll a container until Meta reports FINISHED; bounded by the
    /// configured attempt count
    #[instrument(skip(self))]
    pub async fn wait_for_container(&self, container_id: &str) -> Result<(), PublishError> {
        for attempt in 1..=self.poll_attempts {
            let response = self
                .client
                .get(self.graph_url(container_id))
                .query(&[
                    ("fields", "status_code,status"),
                    ("access_token", self.token.as_str()),
                ])
                .send()
                .await?;

            let body = check_response(response).await?;
            let status_code = body.get("status_code").and_then(Value::as_str).unwrap_or("");
            debug!(
                container_id = container_id,
                status_code = status_code,
                attempt = attempt,
                "Container status"
            );

            match status_code {
                CONTAINER_FINISHED => return Ok(()),
                CONTAINER_ERROR => {
                    return Err(PublishError::ContainerError {
                        container_id: container_id.to_string(),
                        detail: body.to_string(),
                    })
                }
                _ => tokio::time::sleep(self.poll_interval).await,
            }
        }

        Err(PublishError::ContainerTimeout {
            container_id: container_id.to_string(),
            attempts: self.poll_attempts,
        })
    }

    /// Publish a finished Instagram media container
    #[instrument(skip(self))]
    pub async fn publish_media(&self, container_id: &str) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/media_publish", self.ig_account_id)))
            .query(&[
                ("creation_id", container_id),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;

        let body = check_response(response).await?;
        let media_id = extract_id(&body)?;
        info!(media_id = %media_id, "Instagram media published");
        Ok(media_id)
    }

    // ── Facebook ────────────────────────────────────────────────────────

    /// Create and publish a page reel: START, upload by file URL, FINISH
    #[instrument(skip(self, description))]
    pub async fn publish_page_reel(
        &self,
        video_url: &str,
        description: &str,
    ) -> Result<String, PublishError> {
        let reels_url = self.graph_url(&format!("{}/video_reels", self.fb_page_id));

        let response = self
            .client
            .post(&reels_url)
            .query(&[
                ("upload_phase", "START"),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;
        let body = check_response(response).await?;
        let video_id = body
            .get("video_id")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| PublishError::UnexpectedResponse(body.to_string()))?;
        debug!(video_id = %video_id, "Facebook reel upload started");

        let upload_url = format!(
            "{}/video-upload/{}/{}",
            self.upload_base, self.api_version, video_id
        );
        let response = self
            .client
            .post(&upload_url)
            .header("Authorization", format!("OAuth {}", self.token))
            .header("file_url", video_url)
            .send()
            .await?;
        check_response(response).await?;
        debug!(video_id = %video_id, "Facebook reel video uploaded");

        let response = self
            .client
            .post(&reels_url)
            .query(&[
                ("upload_phase", "FINISH"),
                ("video_id", video_id.as_str()),
                ("video_state", "PUBLISHED"),
                ("description", description),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;
        check_response(response).await?;

        info!(video_id = %video_id, "Facebook reel published");
        Ok(video_id)
    }

    /// Post a video to the page feed by file URL
    #[instrument(skip(self, description))]
    pub async fn publish_page_video(
        &self,
        video_url: &str,
        description: &str,
    ) -> Result<String, PublishError> {
        let response = self
            .client
            .post(self.graph_url(&format!("{}/videos", self.fb_page_id)))
            .query(&[
                ("file_url", video_url),
                ("description", description),
                ("access_token", self.token.as_str()),
            ])
            .send()
            .await?;

        let body = check_response(response).await?;
        let video_id = extract_id(&body)?;
        info!(video_id = %video_id, "Facebook feed video published");
        Ok(video_id)
    }
}

/// Turn a non-success response into an Api error carrying the platform's
/// error payload, otherwise parse the JSON body
async fn check_response(response: reqwest::Response) -> Result<Value, PublishError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(PublishError::Api {
            status: status.as_u16(),
            body,
        });
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|_| PublishError::UnexpectedResponse(body))
}

fn extract_id(body: &Value) -> Result<String, PublishError> {
    body.get("id")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| PublishError::UnexpectedResponse(body.to_string()))
}
