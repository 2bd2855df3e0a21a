//! Paragraph service
//!
//! Paragraphs are content blocks attached to exactly one article or one
//! training, carrying text and/or a single media of the selected kind.
//! Validation normalizes the input: fields belonging to other media kinds
//! are cleared before anything is stored.

use crate::db::repositories::{ArticleRepository, ParagraphRepository, TrainingRepository};
use crate::models::{MediaType, Paragraph, ParagraphFilter, ParagraphInput};
use crate::services::content::{is_http_url, max_chars, non_negative, ContentError};
use crate::services::media::MediaStorage;
use anyhow::Context;
use std::sync::Arc;

pub const ERR_BOTH_PARENTS: &str =
    "Un paragraphe ne peut être associé qu'à un article ou une formation, pas les deux.";
pub const ERR_NO_PARENT: &str = "Le paragraphe doit être associé à un article ou une formation.";
pub const ERR_EMPTY: &str = "Le paragraphe doit contenir du texte et/ou un média.";
pub const ERR_IMAGE_MISSING: &str = "Veuillez sélectionner une image.";
pub const ERR_VIDEO_URL_MISSING: &str = "Veuillez fournir une URL vidéo.";
pub const ERR_VIDEO_URL_INVALID: &str = "Veuillez fournir une URL vidéo valide.";
pub const ERR_VIDEO_FILE_MISSING: &str = "Veuillez sélectionner un fichier vidéo.";
pub const ERR_THUMBNAIL_MISSING: &str = "Veuillez fournir une miniature pour le fichier vidéo.";

#[derive(Debug, thiserror::Error)]
pub enum ParagraphError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub const MAX_TITLE_LEN: usize = 200;

/// Field checks shared with the content services report as paragraph
/// validation errors
fn check(result: Result<(), ContentError>) -> Result<(), ParagraphError> {
    result.map_err(|e| match e {
        ContentError::ValidationError(msg) => ParagraphError::Validation(msg),
        other => ParagraphError::Internal(anyhow::Error::new(other)),
    })
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.trim().is_empty())
}

impl ParagraphInput {
    /// Check the parent and media rules, then clear every media field that
    /// does not belong to the selected kind
    pub fn validate(&mut self) -> Result<(), ParagraphError> {
        let invalid = |msg: &str| Err(ParagraphError::Validation(msg.to_string()));

        match (self.article_id, self.training_id) {
            (Some(_), Some(_)) => return invalid(ERR_BOTH_PARENTS),
            (None, None) => return invalid(ERR_NO_PARENT),
            _ => {}
        }

        if let Some(title) = &self.title {
            check(max_chars(title, "title", MAX_TITLE_LEN))?;
        }
        check(non_negative(self.position, "position"))?;

        let has_media = match self.media_type {
            MediaType::None => false,
            MediaType::Image => present(&self.image),
            MediaType::VideoUrl => present(&self.video_url),
            MediaType::VideoFile => present(&self.video_file),
        };
        if !present(&self.content) && !has_media {
            return invalid(ERR_EMPTY);
        }

        match self.media_type {
            MediaType::Image if !present(&self.image) => return invalid(ERR_IMAGE_MISSING),
            MediaType::VideoUrl => match self.video_url.as_deref().map(str::trim) {
                None | Some("") => return invalid(ERR_VIDEO_URL_MISSING),
                Some(url) if !is_http_url(url) => return invalid(ERR_VIDEO_URL_INVALID),
                Some(_) => {}
            },
            MediaType::VideoFile => {
                if !present(&self.video_file) {
                    return invalid(ERR_VIDEO_FILE_MISSING);
                }
                if !present(&self.thumbnail) {
                    return invalid(ERR_THUMBNAIL_MISSING);
                }
            }
            _ => {}
        }

        if self.media_type != MediaType::Image {
            self.image = None;
        }
        if self.media_type != MediaType::VideoUrl {
            self.video_url = None;
        }
        if self.media_type != MediaType::VideoFile {
            self.video_file = None;
            self.thumbnail = None;
        }
        if !present(&self.content) {
            self.content = None;
        }
        if !present(&self.title) {
            self.title = None;
        }
        Ok(())
    }
}

pub struct ParagraphService {
    repo: Arc<dyn ParagraphRepository>,
    article_repo: Arc<dyn ArticleRepository>,
    training_repo: Arc<dyn TrainingRepository>,
    media: Arc<MediaStorage>,
}

impl ParagraphService {
    pub fn new(
        repo: Arc<dyn ParagraphRepository>,
        article_repo: Arc<dyn ArticleRepository>,
        training_repo: Arc<dyn TrainingRepository>,
        media: Arc<MediaStorage>,
    ) -> Self {
        Self {
            repo,
            article_repo,
            training_repo,
            media,
        }
    }

    pub async fn create(&self, mut input: ParagraphInput) -> Result<Paragraph, ParagraphError> {
        input.validate()?;
        self.ensure_parent(&input).await?;
        let file_size_mb = self.video_size(&input).await;

        let paragraph = self
            .repo
            .create(&input, file_size_mb)
            .await
            .context("Failed to create paragraph")?;
        Ok(paragraph)
    }

    pub async fn get(&self, id: i64) -> Result<Paragraph, ParagraphError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get paragraph")?
            .ok_or_else(|| ParagraphError::NotFound(format!("Paragraph {}", id)))
    }

    pub async fn list(&self, filter: &ParagraphFilter) -> Result<Vec<Paragraph>, ParagraphError> {
        Ok(self.repo.list(filter).await.context("Failed to list paragraphs")?)
    }

    pub async fn update(&self, id: i64, mut input: ParagraphInput) -> Result<Paragraph, ParagraphError> {
        input.validate()?;
        self.ensure_parent(&input).await?;
        let file_size_mb = self.video_size(&input).await;

        self.repo
            .update(id, &input, file_size_mb)
            .await
            .context("Failed to update paragraph")?
            .ok_or_else(|| ParagraphError::NotFound(format!("Paragraph {}", id)))
    }

    pub async fn delete(&self, id: i64) -> Result<(), ParagraphError> {
        if !self.repo.delete(id).await.context("Failed to delete paragraph")? {
            return Err(ParagraphError::NotFound(format!("Paragraph {}", id)));
        }
        Ok(())
    }

    async fn ensure_parent(&self, input: &ParagraphInput) -> Result<(), ParagraphError> {
        if let Some(article_id) = input.article_id {
            let found = self
                .article_repo
                .get_by_id(article_id)
                .await
                .context("Failed to get article")?;
            if found.is_none() {
                return Err(ParagraphError::NotFound(format!("Article {}", article_id)));
            }
        }
        if let Some(training_id) = input.training_id {
            let found = self
                .training_repo
                .get_by_id(training_id)
                .await
                .context("Failed to get training")?;
            if found.is_none() {
                return Err(ParagraphError::NotFound(format!("Training {}", training_id)));
            }
        }
        Ok(())
    }

    /// Size of the attached video file; unreadable files give `None`
    async fn video_size(&self, input: &ParagraphInput) -> Option<f64> {
        let path = input.video_file.as_deref()?;
        let size = self.media.file_size_mb(path).await;
        if size.is_none() {
            tracing::debug!(path, "Video file size unavailable");
        }
        size
    }
}
