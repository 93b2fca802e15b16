// Content file parsing
//
// Each content folder carries its copy next to the video, either as
// social_media_content.json (structured, preferred) or
// social_media_content.txt (freeform fallback). Both formats reduce to a
// title, a description, and a list of hashtags.

use crate::errors::ScanError;
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

pub const JSON_CONTENT_FILE: &str = "social_media_content.json";
pub const TXT_CONTENT_FILE: &str = "social_media_content.txt";

/// Parsed copy for one content folder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDoc {
    pub title: String,
    pub description: String,
    /// Tags without the leading '#'
    pub hashtags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    instagram_facebook: PlatformSection,
}

#[derive(Debug, Deserialize, Default)]
struct PlatformSection {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    hashtags: Vec<String>,
}

/// Parse the content files of one folder. JSON wins over TXT; a folder with
/// neither yields an empty document (readiness is decided later by policy).
pub fn parse_content_folder(folder_path: &Path) -> Result<ContentDoc, ScanError> {
    let json_path = folder_path.join(JSON_CONTENT_FILE);
    if json_path.exists() {
        return parse_json(&json_path);
    }

    let txt_path = folder_path.join(TXT_CONTENT_FILE);
    if txt_path.exists() {
        return parse_txt(&txt_path);
    }

    warn!(folder = %folder_path.display(), "No content files found, using empty content");
    Ok(ContentDoc::default())
}

fn parse_json(path: &Path) -> Result<ContentDoc, ScanError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ScanError::ContentUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let file: ContentFile =
        serde_json::from_str(&raw).map_err(|e| ScanError::InvalidContentJson {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let section = file.instagram_facebook;
    let doc = ContentDoc {
        title: section.title.trim().to_string(),
        description: section.description.trim().to_string(),
        hashtags: normalize_hashtags(section.hashtags.iter().map(String::as_str)),
    };

    debug!(
        path = %path.display(),
        title = %doc.title,
        hashtag_count = doc.hashtags.len(),
        "Parsed JSON content"
    );
    Ok(doc)
}

fn parse_txt(path: &Path) -> Result<ContentDoc, ScanError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ScanError::ContentUnreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let section = extract_instagram_section(&raw);

    let title = title_re()
        .captures(&section)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let description = description_re()
        .captures(&section)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();

    let hashtags = hashtags_re()
        .captures(&section)
        .and_then(|c| c.get(1))
        .map(|m| normalize_hashtags(m.as_str().split_whitespace()))
        .unwrap_or_default();

    debug!(path = %path.display(), title = %title, "Parsed TXT content");
    Ok(ContentDoc {
        title,
        description,
        hashtags,
    })
}

/// Pull out the INSTAGRAM / FACEBOOK section of a combined TXT file; a file
/// with no section markers is treated as one big section.
fn extract_instagram_section(raw: &str) -> String {
    if !raw.contains("INSTAGRAM") {
        return raw.to_string();
    }

    let mut in_section = false;
    let mut lines = Vec::new();
    for line in raw.lines() {
        if line.contains("INSTAGRAM") {
            in_section = true;
            continue;
        }
        if in_section && (line.contains("YOUTUBE") || line.contains("======")) {
            break;
        }
        if in_section {
            lines.push(line);
        }
    }
    lines.join("\n")
}

/// Strip '#' prefixes and drop empty tags
fn normalize_hashtags<'a>(tags: impl Iterator<Item = &'a str>) -> Vec<String> {
    tags.map(|t| t.trim().trim_start_matches('#').to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Title:\s*(.+)").expect("valid title regex"))
}

fn description_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Description:\s*\n(.+?)(?:\nHashtags:|\n\n\n|\z)")
            .expect("valid description regex")
    })
}

fn hashtags_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)Hashtags:\s*\n(.+?)(?:\n\n|\z)").expect("valid hashtags regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_folder(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, body) in files {
            fs::write(dir.path().join(name), body).unwrap();
        }
        dir
    }

    #[test]
    fn test_json_content_preferred() {
        let dir = write_folder(&[
            (
                JSON_CONTENT_FILE,
                r##"{"instagram_facebook": {"title": "A", "description": "B", "hashtags": ["x", "#y"]}}"##,
            ),
            (TXT_CONTENT_FILE, "Title: ignored"),
        ]);

        let doc = parse_content_folder(dir.path()).unwrap();
        assert_eq!(doc.title, "A");
        assert_eq!(doc.description, "B");
        assert_eq!(doc.hashtags, vec!["x", "y"]);
    }

    #[test]
    fn test_json_missing_section_yields_empty_doc() {
        let dir = write_folder(&[(JSON_CONTENT_FILE, r#"{"youtube": {"title": "A"}}"#)]);
        let doc = parse_content_folder(dir.path()).unwrap();
        assert_eq!(doc, ContentDoc::default());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = write_folder(&[(JSON_CONTENT_FILE, "{not json")]);
        let err = parse_content_folder(dir.path()).unwrap_err();
        assert!(matches!(err, ScanError::InvalidContentJson { .. }));
    }

    #[test]
    fn test_txt_fallback_parses_sections() {
        let body = "\
📱 INSTAGRAM / FACEBOOK
Title: My Reel
Description:
First line.
Second line.
Hashtags:
#Alpha #Beta

======
🎬 YOUTUBE
Title: other
";
        let dir = write_folder(&[(TXT_CONTENT_FILE, body)]);
        let doc = parse_content_folder(dir.path()).unwrap();
        assert_eq!(doc.title, "My Reel");
        assert_eq!(doc.description, "First line.\nSecond line.");
        assert_eq!(doc.hashtags, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn test_txt_without_section_markers() {
        let body = "Title: Plain\nDescription:\nJust text.\nHashtags:\n#one\n";
        let dir = write_folder(&[(TXT_CONTENT_FILE, body)]);
        let doc = parse_content_folder(dir.path()).unwrap();
        assert_eq!(doc.title, "Plain");
        assert_eq!(doc.description, "Just text.");
        assert_eq!(doc.hashtags, vec!["one"]);
    }

    #[test]
    fn test_no_content_files_yields_empty_doc() {
        let dir = TempDir::new().unwrap();
        let doc = parse_content_folder(dir.path()).unwrap();
        assert_eq!(doc, ContentDoc::default());
    }
}
