//! Ebook service

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::EbookRepository;
use crate::models::{Ebook, EbookFilter, EbookInput, EbookWithStats};
use crate::services::content::{is_unique_violation, max_chars, non_negative, require, ContentError};
use crate::services::slug::resolve_slug;
use anyhow::Context;
use std::sync::Arc;

pub struct EbookService {
    repo: Arc<dyn EbookRepository>,
    cache: Arc<Cache>,
}

impl EbookService {
    pub fn new(repo: Arc<dyn EbookRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: EbookInput) -> Result<Ebook, ContentError> {
        validate(&input)?;
        let slug = self.unique_slug(&input, None).await?;

        let ebook = self.repo.create(&slug, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                ContentError::DuplicateSlug(slug.clone())
            } else {
                e.into()
            }
        })?;

        invalidate_public(&self.cache).await;
        tracing::info!(ebook_id = ebook.id, slug = %ebook.slug, "Ebook created");
        Ok(ebook)
    }

    pub async fn get(&self, id: i64) -> Result<Ebook, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get ebook")?
            .ok_or_else(|| ContentError::NotFound(format!("Ebook {}", id)))
    }

    /// Admin listing with the number of leads per ebook
    pub async fn list(&self, filter: &EbookFilter) -> Result<Vec<EbookWithStats>, ContentError> {
        Ok(self
            .repo
            .list_with_stats(filter)
            .await
            .context("Failed to list ebooks")?)
    }

    pub async fn update(&self, id: i64, input: EbookInput) -> Result<Ebook, ContentError> {
        validate(&input)?;
        let slug = self.unique_slug(&input, Some(id)).await?;

        let ebook = self
            .repo
            .update(id, &slug, &input)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ContentError::DuplicateSlug(slug.clone())
                } else {
                    e.into()
                }
            })?
            .ok_or_else(|| ContentError::NotFound(format!("Ebook {}", id)))?;

        invalidate_public(&self.cache).await;
        Ok(ebook)
    }

    /// Delete an ebook and every lead collected for it
    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        if !self.repo.delete(id).await.context("Failed to delete ebook")? {
            return Err(ContentError::NotFound(format!("Ebook {}", id)));
        }

        invalidate_public(&self.cache).await;
        tracing::info!(ebook_id = id, "Ebook deleted");
        Ok(())
    }

    async fn unique_slug(&self, input: &EbookInput, exclude_id: Option<i64>) -> Result<String, ContentError> {
        let slug = resolve_slug(input.slug.as_deref(), &input.title)
            .ok_or_else(|| ContentError::ValidationError("slug cannot be empty".to_string()))?;

        if self
            .repo
            .slug_exists(&slug, exclude_id)
            .await
            .context("Failed to check ebook slug")?
        {
            return Err(ContentError::DuplicateSlug(slug));
        }
        Ok(slug)
    }
}

fn validate(input: &EbookInput) -> Result<(), ContentError> {
    require(&input.title, "title")?;
    max_chars(&input.title, "title", 200)?;
    require(&input.description, "description")?;
    require(&input.cover_image, "cover_image")?;
    require(&input.file, "file")?;
    non_negative(input.position, "position")?;
    Ok(())
}
