//! Testimonial service

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::TestimonialRepository;
use crate::models::{Testimonial, TestimonialFilter, TestimonialInput};
use crate::services::content::{max_chars, require, ContentError};
use anyhow::Context;
use std::sync::Arc;

pub struct TestimonialService {
    repo: Arc<dyn TestimonialRepository>,
    cache: Arc<Cache>,
}

impl TestimonialService {
    pub fn new(repo: Arc<dyn TestimonialRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, input: TestimonialInput) -> Result<Testimonial, ContentError> {
        validate(&input)?;
        let testimonial = self
            .repo
            .create(&input)
            .await
            .context("Failed to create testimonial")?;

        invalidate_public(&self.cache).await;
        Ok(testimonial)
    }

    pub async fn get(&self, id: i64) -> Result<Testimonial, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get testimonial")?
            .ok_or_else(|| ContentError::NotFound(format!("Testimonial {}", id)))
    }

    pub async fn list(&self, filter: &TestimonialFilter) -> Result<Vec<Testimonial>, ContentError> {
        Ok(self.repo.list(filter).await.context("Failed to list testimonials")?)
    }

    pub async fn update(&self, id: i64, input: TestimonialInput) -> Result<Testimonial, ContentError> {
        validate(&input)?;
        let testimonial = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update testimonial")?
            .ok_or_else(|| ContentError::NotFound(format!("Testimonial {}", id)))?;

        invalidate_public(&self.cache).await;
        Ok(testimonial)
    }

    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        if !self.repo.delete(id).await.context("Failed to delete testimonial")? {
            return Err(ContentError::NotFound(format!("Testimonial {}", id)));
        }

        invalidate_public(&self.cache).await;
        Ok(())
    }
}

fn validate(input: &TestimonialInput) -> Result<(), ContentError> {
    require(&input.name, "name")?;
    max_chars(&input.name, "name", 100)?;
    require(&input.role, "role")?;
    max_chars(&input.role, "role", 100)?;
    require(&input.avatar, "avatar")?;
    require(&input.quote, "quote")?;
    if !(1..=5).contains(&input.rating) {
        return Err(ContentError::ValidationError(
            "rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}
