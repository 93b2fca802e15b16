use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// ============================================================================
// Platform & Surface
// ============================================================================

/// Social platform a post targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Facebook,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Instagram => write!(f, "instagram"),
            Platform::Facebook => write!(f, "facebook"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "instagram" => Ok(Platform::Instagram),
            "facebook" => Ok(Platform::Facebook),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Posting modality on a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Reel,
    Story,
    Feed,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Reel => write!(f, "reel"),
            Surface::Story => write!(f, "story"),
            Surface::Feed => write!(f, "feed"),
        }
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reel" => Ok(Surface::Reel),
            "story" => Ok(Surface::Story),
            "feed" => Ok(Surface::Feed),
            other => Err(format!("unknown surface: {}", other)),
        }
    }
}

/// A concrete (platform, surface) posting target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub platform: Platform,
    pub surface: Surface,
}

impl Target {
    pub const IG_REEL: Target = Target {
        platform: Platform::Instagram,
        surface: Surface::Reel,
    };
    pub const IG_STORY: Target = Target {
        platform: Platform::Instagram,
        surface: Surface::Story,
    };
    pub const FB_REEL: Target = Target {
        platform: Platform::Facebook,
        surface: Surface::Reel,
    };
    pub const FB_FEED: Target = Target {
        platform: Platform::Facebook,
        surface: Surface::Feed,
    };

    /// All supported targets in dispatch order
    pub const ALL: [Target; 4] = [
        Target::IG_REEL,
        Target::IG_STORY,
        Target::FB_REEL,
        Target::FB_FEED,
    ];
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform, self.surface)
    }
}

// ============================================================================
// Post status
// ============================================================================

/// Status of one publish attempt for a (folder, platform, surface) tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    /// Attempt in flight
    Pending,
    /// Published; terminal, never overwritten
    Posted,
    /// Platform call failed; re-attempted on the next trigger
    Failed,
    /// Surface permanently ineligible for this item (e.g. duration limits)
    Skipped,
}

impl PostStatus {
    /// Posted and Skipped both count as settled: the surface needs no
    /// further attempts for this item
    pub fn is_settled(&self) -> bool {
        matches!(self, PostStatus::Posted | PostStatus::Skipped)
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostStatus::Pending => write!(f, "pending"),
            PostStatus::Posted => write!(f, "posted"),
            PostStatus::Failed => write!(f, "failed"),
            PostStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for PostStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PostStatus::Pending),
            "posted" => Ok(PostStatus::Posted),
            "failed" => Ok(PostStatus::Failed),
            "skipped" => Ok(PostStatus::Skipped),
            other => Err(format!("unknown post status: {}", other)),
        }
    }
}

// ============================================================================
// Content
// ============================================================================

/// One scanned content folder, immutable once read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
    /// Normalized folder name; the dedup key across the ledger
    pub folder_id: String,
    pub folder_path: PathBuf,
    pub video_path: PathBuf,
    pub title: String,
    pub description: String,
    /// Tags without the leading '#'
    pub hashtags: Vec<String>,
    pub duration_seconds: f64,
}

impl ContentItem {
    /// Hashtag line with '#' prefixes, e.g. "#x #y"
    pub fn hashtag_line(&self) -> String {
        self.hashtags
            .iter()
            .map(|t| format!("#{}", t))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Caption for reels and feed posts: title, description, and hashtag
    /// line joined by blank lines, empty parts omitted
    pub fn reel_caption(&self) -> String {
        let hashtag_line = self.hashtag_line();
        [&self.title, &self.description, &hashtag_line]
            .into_iter()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Story reference: title only
    pub fn story_caption(&self) -> &str {
        &self.title
    }

    /// Readiness under the configured empty-description policy
    pub fn is_ready(&self, allow_empty_description: bool) -> bool {
        allow_empty_description || !self.description.is_empty()
    }
}

// ============================================================================
// Ledger records
// ============================================================================

/// One row of the post ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub folder_id: String,
    pub platform: Platform,
    pub surface: Surface,
    pub status: PostStatus,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Per-surface outcomes of one dispatch
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub folder_id: String,
    pub outcomes: Vec<(Target, PostStatus)>,
}

impl DispatchReport {
    pub fn new(folder_id: &str) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            outcomes: Vec::new(),
        }
    }

    /// True when every attempted or previously settled surface is settled,
    /// i.e. the item can move to the processed directory
    pub fn all_settled(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, s)| s.is_settled())
    }

    pub fn failed_targets(&self) -> Vec<Target> {
        self.outcomes
            .iter()
            .filter(|(_, s)| *s == PostStatus::Failed)
            .map(|(t, _)| *t)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, description: &str, hashtags: &[&str]) -> ContentItem {
        ContentItem {
            folder_id: "folder_001".to_string(),
            folder_path: PathBuf::from("input/folder_001"),
            video_path: PathBuf::from("input/folder_001/final_video.mp4"),
            title: title.to_string(),
            description: description.to_string(),
            hashtags: hashtags.iter().map(|s| s.to_string()).collect(),
            duration_seconds: 42.0,
        }
    }

    #[test]
    fn test_reel_caption_combines_all_parts() {
        let item = item("A", "B", &["x", "y"]);
        assert_eq!(item.reel_caption(), "A\n\nB\n\n#x #y");
    }

    #[test]
    fn test_reel_caption_omits_empty_parts() {
        let item = item("A", "", &[]);
        assert_eq!(item.reel_caption(), "A");
    }

    #[test]
    fn test_story_caption_is_title_only() {
        let item = item("A", "B", &["x"]);
        assert_eq!(item.story_caption(), "A");
    }

    #[test]
    fn test_readiness_policy_for_empty_description() {
        let empty = item("A", "", &[]);
        assert!(!empty.is_ready(false));
        assert!(empty.is_ready(true));
        assert!(item("A", "B", &[]).is_ready(false));
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            PostStatus::Pending,
            PostStatus::Posted,
            PostStatus::Failed,
            PostStatus::Skipped,
        ] {
            let parsed: PostStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_settled_statuses() {
        assert!(PostStatus::Posted.is_settled());
        assert!(PostStatus::Skipped.is_settled());
        assert!(!PostStatus::Failed.is_settled());
        assert!(!PostStatus::Pending.is_settled());
    }

    #[test]
    fn test_platform_surface_roundtrip() {
        assert_eq!("instagram".parse::<Platform>().unwrap(), Platform::Instagram);
        assert_eq!("feed".parse::<Surface>().unwrap(), Surface::Feed);
        assert!("tiktok".parse::<Platform>().is_err());
    }

    #[test]
    fn test_dispatch_report_all_settled() {
        let mut report = DispatchReport::new("folder_001");
        assert!(!report.all_settled());
        report.outcomes.push((Target::IG_REEL, PostStatus::Posted));
        report.outcomes.push((Target::IG_STORY, PostStatus::Skipped));
        assert!(report.all_settled());
        report.outcomes.push((Target::FB_FEED, PostStatus::Failed));
        assert!(!report.all_settled());
        assert_eq!(report.failed_targets(), vec![Target::FB_FEED]);
    }
}
