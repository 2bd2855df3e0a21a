//! Media storage
//!
//! Uploaded and imported files live under the configured media directory,
//! one sub-directory per kind. Entities store the path relative to that
//! directory (e.g. `articles/6f1c….jpg`); the public API exposes it as a URL
//! under the media URL prefix.

use crate::config::MediaConfig;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use uuid::Uuid;

/// Where a stored file belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Author,
    Testimonial,
    Article,
    Training,
    Paragraph,
    ParagraphVideo,
    ParagraphThumbnail,
    EbookCover,
    EbookFile,
}

impl MediaKind {
    /// Directory under the media root
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::Author => "authors",
            MediaKind::Testimonial => "testimonials",
            MediaKind::Article => "articles",
            MediaKind::Training => "trainings",
            MediaKind::Paragraph => "paragraphs",
            MediaKind::ParagraphVideo => "paragraph_videos",
            MediaKind::ParagraphThumbnail => "paragraph_thumbnails",
            MediaKind::EbookCover => "ebooks/covers",
            MediaKind::EbookFile => "ebooks/files",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    /// Accepts the directory name; `ebook_covers` and `ebook_files` also name
    /// the nested ebook directories
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authors" => Ok(MediaKind::Author),
            "testimonials" => Ok(MediaKind::Testimonial),
            "articles" => Ok(MediaKind::Article),
            "trainings" => Ok(MediaKind::Training),
            "paragraphs" => Ok(MediaKind::Paragraph),
            "paragraph_videos" => Ok(MediaKind::ParagraphVideo),
            "paragraph_thumbnails" => Ok(MediaKind::ParagraphThumbnail),
            "ebooks/covers" | "ebook_covers" => Ok(MediaKind::EbookCover),
            "ebooks/files" | "ebook_files" => Ok(MediaKind::EbookFile),
            _ => Err(format!("Unknown media kind: {}", s)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("File too large. Maximum size: {max} bytes")]
    TooLarge { max: u64 },

    #[error("Invalid media path: {0}")]
    InvalidPath(String),

    #[error("Media I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Files on disk under the media root
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url_prefix: String,
    max_file_size: u64,
}

impl MediaStorage {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            root: config.path.clone(),
            url_prefix: config.url_prefix.trim_end_matches('/').to_string(),
            max_file_size: config.max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Public URL of a stored path, e.g. `/media/articles/a.jpg`
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() || path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.url_prefix, path.trim_start_matches('/'))
    }

    /// [`url`](Self::url) for optional fields, blank paths become `None`
    pub fn url_opt(&self, path: Option<&str>) -> Option<String> {
        path.filter(|p| !p.is_empty()).map(|p| self.url(p))
    }

    /// Absolute location of a stored path, refusing anything that escapes
    /// the media root
    pub fn resolve(&self, path: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Store bytes under a fresh name, returns the stored path
    pub async fn save_bytes(
        &self,
        kind: MediaKind,
        original_name: &str,
        data: &[u8],
    ) -> Result<String, MediaError> {
        if data.len() as u64 > self.max_file_size {
            return Err(MediaError::TooLarge {
                max: self.max_file_size,
            });
        }

        let (relative, absolute) = self.allocate(kind, original_name).await?;
        fs::write(&absolute, data).await?;

        tracing::debug!(path = %relative, size = data.len(), "Stored media file");
        Ok(relative)
    }

    /// Copy a local file (e.g. a download in a temp file) into storage
    pub async fn save_file(
        &self,
        kind: MediaKind,
        original_name: &str,
        source: &Path,
    ) -> Result<String, MediaError> {
        let size = fs::metadata(source).await?.len();
        if size > self.max_file_size {
            return Err(MediaError::TooLarge {
                max: self.max_file_size,
            });
        }

        let (relative, absolute) = self.allocate(kind, original_name).await?;
        fs::copy(source, &absolute).await?;

        tracing::debug!(path = %relative, size, "Stored media file");
        Ok(relative)
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub async fn delete(&self, path: &str) -> Result<bool, MediaError> {
        let absolute = self.resolve(path)?;
        match fs::remove_file(&absolute).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Size of a stored file in MiB, `None` when it cannot be read
    pub async fn file_size_mb(&self, path: &str) -> Option<f64> {
        let absolute = self.resolve(path).ok()?;
        let metadata = fs::metadata(absolute).await.ok()?;
        Some(metadata.len() as f64 / (1024.0 * 1024.0))
    }

    async fn allocate(&self, kind: MediaKind, original_name: &str) -> Result<(String, PathBuf), MediaError> {
        let dir = self.root.join(kind.dir());
        fs::create_dir_all(&dir).await?;

        let filename = match extension(original_name) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{}/{}", kind.dir(), filename);
        Ok((relative, dir.join(filename)))
    }
}

/// Lowercased extension when it is short and alphanumeric
fn extension(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let valid = !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(ext)
}
