//! Training service

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::TrainingRepository;
use crate::models::{Training, TrainingFilter, TrainingInput};
use crate::services::content::{
    blank_to_none, is_unique_violation, max_chars, non_negative, optional_url, require, ContentError,
};
use crate::services::slug::resolve_slug;
use anyhow::Context;
use std::sync::Arc;

pub struct TrainingService {
    repo: Arc<dyn TrainingRepository>,
    cache: Arc<Cache>,
}

impl TrainingService {
    pub fn new(repo: Arc<dyn TrainingRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, mut input: TrainingInput) -> Result<Training, ContentError> {
        validate(&mut input)?;
        let slug = self.unique_slug(&input, None).await?;

        let training = self.repo.create(&slug, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                ContentError::DuplicateSlug(slug.clone())
            } else {
                e.into()
            }
        })?;

        invalidate_public(&self.cache).await;
        tracing::info!(training_id = training.id, slug = %training.slug, "Training created");
        Ok(training)
    }

    pub async fn get(&self, id: i64) -> Result<Training, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get training")?
            .ok_or_else(|| ContentError::NotFound(format!("Training {}", id)))
    }

    /// Admin listing, inactive trainings included
    pub async fn list(&self, filter: &TrainingFilter) -> Result<Vec<Training>, ContentError> {
        Ok(self
            .repo
            .list(filter)
            .await
            .context("Failed to list trainings")?)
    }

    pub async fn update(&self, id: i64, mut input: TrainingInput) -> Result<Training, ContentError> {
        validate(&mut input)?;
        let slug = self.unique_slug(&input, Some(id)).await?;

        let training = self
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
            .ok_or_else(|| ContentError::NotFound(format!("Training {}", id)))?;

        invalidate_public(&self.cache).await;
        Ok(training)
    }

    /// Delete a training together with its paragraphs
    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        if !self.repo.delete(id).await.context("Failed to delete training")? {
            return Err(ContentError::NotFound(format!("Training {}", id)));
        }

        invalidate_public(&self.cache).await;
        tracing::info!(training_id = id, "Training deleted");
        Ok(())
    }

    async fn unique_slug(&self, input: &TrainingInput, exclude_id: Option<i64>) -> Result<String, ContentError> {
        let slug = resolve_slug(input.slug.as_deref(), &input.title)
            .ok_or_else(|| ContentError::ValidationError("slug cannot be empty".to_string()))?;

        if self
            .repo
            .slug_exists(&slug, exclude_id)
            .await
            .context("Failed to check training slug")?
        {
            return Err(ContentError::DuplicateSlug(slug));
        }
        Ok(slug)
    }
}

fn validate(input: &mut TrainingInput) -> Result<(), ContentError> {
    require(&input.title, "title")?;
    max_chars(&input.title, "title", 200)?;
    require(&input.short_description, "short_description")?;
    require(&input.image, "image")?;
    if let Some(duration) = &input.duration {
        max_chars(duration, "duration", 50)?;
    }
    optional_url(input.video_url.as_deref(), "video_url")?;
    non_negative(input.position, "position")?;

    blank_to_none(&mut input.duration);
    blank_to_none(&mut input.video_url);
    Ok(())
}
