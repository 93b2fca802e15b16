// Content scanning
//
// The scanner re-reads the input directory from scratch on every invocation;
// there is no persistent cursor. Broken folders are excluded and logged, they
// never abort the scan.

pub mod parser;

use crate::errors::ScanError;
use crate::models::ContentItem;
use crate::probe::DurationProbe;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub use parser::{parse_content_folder, ContentDoc};

/// Scans an input directory whose immediate subdirectories each represent
/// one content item
pub struct ContentScanner {
    input_dir: PathBuf,
    probe: Arc<dyn DurationProbe>,
}

impl ContentScanner {
    pub fn new(input_dir: PathBuf, probe: Arc<dyn DurationProbe>) -> Self {
        Self { input_dir, probe }
    }

    /// Enumerate candidate items in folder-name order. Folders without a
    /// playable video are excluded; duplicate normalized folder ids keep the
    /// first occurrence only.
    #[instrument(skip(self), fields(input_dir = %self.input_dir.display()))]
    pub async fn scan(&self) -> Result<Vec<ContentItem>, ScanError> {
        if !self.input_dir.is_dir() {
            return Err(ScanError::InputDirMissing(
                self.input_dir.display().to_string(),
            ));
        }

        let mut folders: Vec<PathBuf> = std::fs::read_dir(&self.input_dir)
            .map_err(|e| ScanError::DirUnreadable {
                path: self.input_dir.display().to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        folders.sort();

        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        for folder in &folders {
            match self.scan_folder(folder, &mut seen_ids).await {
                Ok(item) => items.push(item),
                Err(e) => {
                    warn!(folder = %folder.display(), error = %e, "Excluding folder from candidates");
                }
            }
        }

        info!(
            folder_count = folders.len(),
            candidate_count = items.len(),
            "Input scan complete"
        );
        Ok(items)
    }

    async fn scan_folder(
        &self,
        folder: &Path,
        seen_ids: &mut HashSet<String>,
    ) -> Result<ContentItem, ScanError> {
        let folder_id = normalize_folder_id(folder)?;
        if !seen_ids.insert(folder_id.to_lowercase()) {
            return Err(ScanError::DuplicateFolderId(folder_id));
        }

        let video_path = find_video_file(folder)
            .ok_or_else(|| ScanError::VideoMissing(folder.display().to_string()))?;

        let duration_seconds = self
            .probe
            .duration_seconds(&video_path)
            .await
            .map_err(|e| ScanError::VideoUnreadable {
                folder: folder.display().to_string(),
                reason: e.to_string(),
            })?;

        let doc = parse_content_folder(folder)?;
        if doc.description.is_empty() {
            debug!(folder_id = %folder_id, "Item has no description");
        }

        Ok(ContentItem {
            folder_id,
            folder_path: folder.to_path_buf(),
            video_path,
            title: doc.title,
            description: doc.description,
            hashtags: doc.hashtags,
            duration_seconds,
        })
    }
}

/// Derive the ledger key from a folder name: trimmed, non-empty. Uniqueness
/// is checked case-insensitively at ingestion.
fn normalize_folder_id(folder: &Path) -> Result<String, ScanError> {
    let name = folder
        .file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if name.is_empty() {
        return Err(ScanError::EmptyFolderId(folder.display().to_string()));
    }
    Ok(name)
}

/// Locate the video inside a content folder: final_video*.mp4 wins over any
/// other .mp4
fn find_video_file(folder: &Path) -> Option<PathBuf> {
    let mut mp4s: Vec<PathBuf> = std::fs::read_dir(folder)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case("mp4"))
                    .unwrap_or(false)
        })
        .collect();
    mp4s.sort();

    mp4s.iter()
        .find(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with("final_video"))
                .unwrap_or(false)
        })
        .cloned()
        .or_else(|| mp4s.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_video_prefers_final_video() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a_clip.mp4"), b"x").unwrap();
        fs::write(dir.path().join("final_video_v2.mp4"), b"x").unwrap();

        let found = find_video_file(dir.path()).unwrap();
        assert_eq!(
            found.file_name().unwrap().to_string_lossy(),
            "final_video_v2.mp4"
        );
    }

    #[test]
    fn test_find_video_falls_back_to_any_mp4() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("clip.mp4"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        let found = find_video_file(dir.path()).unwrap();
        assert_eq!(found.file_name().unwrap().to_string_lossy(), "clip.mp4");
    }

    #[test]
    fn test_find_video_none_without_mp4() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        assert!(find_video_file(dir.path()).is_none());
    }
}
