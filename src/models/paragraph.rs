//! Paragraph model
//!
//! A paragraph is a content block attached to exactly one article or one
//! training. It carries text and/or a single kind of media.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of media attached to a paragraph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Text only
    #[default]
    None,
    Image,
    /// Link to an externally hosted video
    VideoUrl,
    /// Uploaded video file with a thumbnail
    VideoFile,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::None => "none",
            MediaType::Image => "image",
            MediaType::VideoUrl => "video_url",
            MediaType::VideoFile => "video_file",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(MediaType::None),
            "image" => Ok(MediaType::Image),
            "video_url" => Ok(MediaType::VideoUrl),
            "video_file" => Ok(MediaType::VideoFile),
            _ => Err(format!("Invalid media type: {}", s)),
        }
    }
}

/// Admin list filter for paragraphs
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParagraphFilter {
    /// Matches title or content
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub article_id: Option<i64>,
    #[serde(default)]
    pub training_id: Option<i64>,
    #[serde(default)]
    pub media_type: Option<MediaType>,
}

/// Paragraph entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub media_type: MediaType,
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub thumbnail: Option<String>,
    /// Size of `video_file` in megabytes, computed on save
    pub file_size_mb: Option<f64>,
    pub position: i64,
    pub article_id: Option<i64>,
    pub training_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a paragraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub video_file: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub position: i64,
    #[serde(default)]
    pub article_id: Option<i64>,
    #[serde(default)]
    pub training_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_roundtrip() {
        for kind in [
            MediaType::None,
            MediaType::Image,
            MediaType::VideoUrl,
            MediaType::VideoFile,
        ] {
            assert_eq!(kind.as_str().parse::<MediaType>().unwrap(), kind);
        }
        assert!("gif".parse::<MediaType>().is_err());
    }

    #[test]
    fn test_media_type_serde_names() {
        assert_eq!(serde_json::to_string(&MediaType::VideoFile).unwrap(), "\"video_file\"");
        let kind: MediaType = serde_json::from_str("\"video_url\"").unwrap();
        assert_eq!(kind, MediaType::VideoUrl);
    }
}
