// Publishing orchestration
//
// One dispatch takes one content item and walks its enabled targets in a
// fixed order. Surfaces already settled in the ledger are skipped without a
// new record; a failure on one surface never blocks the rest. There is no
// retry loop here: Failed rows simply stay unsettled and the next trigger
// re-attempts them.

use crate::config::{FolderConfig, PlatformConfig};
use crate::errors::{LedgerError, PublishError};
use crate::ledger::PostRecordRepository;
use crate::media::MediaHost;
use crate::meta::MetaClient;
use crate::models::{ContentItem, DispatchReport, PostStatus, Surface, Target};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Meta duration ceilings for reels and stories, in seconds
pub const MAX_REEL_SECONDS: f64 = 180.0;
pub const MAX_STORY_SECONDS: f64 = 60.0;

pub struct Publisher {
    meta: Arc<MetaClient>,
    media: Arc<dyn MediaHost>,
    ledger: Arc<PostRecordRepository>,
    platforms: PlatformConfig,
    processed_dir: PathBuf,
}

impl Publisher {
    pub fn new(
        meta: Arc<MetaClient>,
        media: Arc<dyn MediaHost>,
        ledger: Arc<PostRecordRepository>,
        platforms: PlatformConfig,
        folders: &FolderConfig,
    ) -> Self {
        Self {
            meta,
            media,
            ledger,
            platforms,
            processed_dir: folders.processed_dir.clone(),
        }
    }

    /// Targets enabled by configuration, in dispatch order
    pub fn enabled_targets(&self) -> Vec<Target> {
        let p = &self.platforms;
        Target::ALL
            .into_iter()
            .filter(|t| match *t {
                Target::IG_REEL => p.ig_enabled && p.ig_post_reel,
                Target::IG_STORY => p.ig_enabled && p.ig_post_story,
                Target::FB_REEL => p.fb_enabled && p.fb_post_reel,
                Target::FB_FEED => p.fb_enabled && p.fb_post_feed,
                _ => false,
            })
            .collect()
    }

    /// Publish one item to every enabled target that is not yet settled.
    /// Ledger failures propagate; platform failures are recorded per surface.
    #[instrument(skip(self, item), fields(folder_id = %item.folder_id))]
    pub async fn dispatch(&self, item: &ContentItem) -> Result<DispatchReport, LedgerError> {
        let mut report = DispatchReport::new(&item.folder_id);

        let settled: HashMap<Target, PostStatus> = self
            .ledger
            .records_for(&item.folder_id)
            .await?
            .into_iter()
            .filter(|r| r.status.is_settled())
            .map(|r| {
                (
                    Target {
                        platform: r.platform,
                        surface: r.surface,
                    },
                    r.status,
                )
            })
            .collect();

        let video_url = match self.media.resolve(item).await {
            Ok(url) => url,
            Err(e) => {
                // Without a public URL no surface can be attempted; keep the
                // item unsettled so the next trigger retries it whole.
                error!(error = %e, "Could not resolve a public video URL, skipping dispatch");
                return Ok(report);
            }
        };

        for target in self.enabled_targets() {
            if let Some(status) = settled.get(&target) {
                info!(target = %target, status = %status, "Surface already settled, skipping");
                report.outcomes.push((target, *status));
                continue;
            }

            if let Some(reason) = duration_gate(target.surface, item.duration_seconds) {
                warn!(target = %target, reason = %reason, "Surface skipped");
                self.ledger
                    .record(
                        &item.folder_id,
                        target.platform,
                        target.surface,
                        PostStatus::Skipped,
                        Some(&reason),
                    )
                    .await?;
                report.outcomes.push((target, PostStatus::Skipped));
                continue;
            }

            self.ledger
                .record(
                    &item.folder_id,
                    target.platform,
                    target.surface,
                    PostStatus::Pending,
                    None,
                )
                .await?;

            match self.publish_target(target, item, &video_url).await {
                Ok(()) => {
                    info!(target = %target, "Surface published");
                    self.ledger
                        .record(
                            &item.folder_id,
                            target.platform,
                            target.surface,
                            PostStatus::Posted,
                            None,
                        )
                        .await?;
                    report.outcomes.push((target, PostStatus::Posted));
                }
                Err(e) => {
                    error!(target = %target, error = %e, "Surface publish failed");
                    self.ledger
                        .record(
                            &item.folder_id,
                            target.platform,
                            target.surface,
                            PostStatus::Failed,
                            Some(&e.to_string()),
                        )
                        .await?;
                    report.outcomes.push((target, PostStatus::Failed));
                }
            }
        }

        Ok(report)
    }

    async fn publish_target(
        &self,
        target: Target,
        item: &ContentItem,
        video_url: &str,
    ) -> Result<(), PublishError> {
        match target {
            Target::IG_REEL => {
                let caption = item.reel_caption();
                let container_id = self.meta.create_reel_container(video_url, &caption).await?;
                self.meta.wait_for_container(&container_id).await?;
                self.meta.publish_media(&container_id).await?;
            }
            Target::IG_STORY => {
                info!(story_ref = %item.story_caption(), "Posting story");
                let container_id = self.meta.create_story_container(video_url).await?;
                self.meta.wait_for_container(&container_id).await?;
                self.meta.publish_media(&container_id).await?;
            }
            Target::FB_REEL => {
                self.meta
                    .publish_page_reel(video_url, &item.reel_caption())
                    .await?;
            }
            Target::FB_FEED => {
                self.meta
                    .publish_page_video(video_url, &item.reel_caption())
                    .await?;
            }
            other => {
                return Err(PublishError::UnexpectedResponse(format!(
                    "unsupported target: {}",
                    other
                )))
            }
        }
        Ok(())
    }

    /// Relocate a fully settled item's folder into the processed directory.
    /// A failed move is logged but never fails the dispatch.
    #[instrument(skip(self, item, report), fields(folder_id = %item.folder_id))]
    pub async fn finalize(&self, item: &ContentItem, report: &DispatchReport) {
        if !report.all_settled() {
            let failed = report.failed_targets();
            if !failed.is_empty() {
                warn!(
                    failed_targets = ?failed.iter().map(|t| t.to_string()).collect::<Vec<_>>(),
                    "Some surfaces failed, keeping folder in input for retry"
                );
            }
            return;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.processed_dir).await {
            error!(error = %e, "Could not create processed directory");
            return;
        }

        let destination = self.processed_dir.join(
            item.folder_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new(&item.folder_id)),
        );
        match tokio::fs::rename(&item.folder_path, &destination).await {
            Ok(()) => info!(destination = %destination.display(), "Folder moved to processed"),
            Err(e) => error!(error = %e, "Failed to move folder to processed"),
        }
    }
}

/// Reason a surface is permanently ineligible for a video, if any
fn duration_gate(surface: Surface, duration_seconds: f64) -> Option<String> {
    match surface {
        Surface::Reel if duration_seconds > MAX_REEL_SECONDS => Some(format!(
            "duration {:.1}s exceeds reel limit of {:.0}s",
            duration_seconds, MAX_REEL_SECONDS
        )),
        Surface::Story if duration_seconds > MAX_STORY_SECONDS => Some(format!(
            "duration {:.1}s exceeds story limit of {:.0}s",
            duration_seconds, MAX_STORY_SECONDS
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_gate_limits() {
        assert!(duration_gate(Surface::Reel, 200.0).is_some());
        assert!(duration_gate(Surface::Reel, 179.0).is_none());
        assert!(duration_gate(Surface::Story, 90.0).is_some());
        assert!(duration_gate(Surface::Story, 59.0).is_none());
        assert!(duration_gate(Surface::Feed, 100_000.0).is_none());
    }
}
