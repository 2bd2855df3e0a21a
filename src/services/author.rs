//! Author service

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::AuthorRepository;
use crate::models::{Author, AuthorInput};
use crate::services::content::{blank_to_none, max_chars, require, ContentError};
use anyhow::Context;
use std::sync::Arc;

const MAX_NAME_LEN: usize = 100;

pub struct AuthorService {
    repo: Arc<dyn AuthorRepository>,
    cache: Arc<Cache>,
}

impl AuthorService {
    pub fn new(repo: Arc<dyn AuthorRepository>, cache: Arc<Cache>) -> Self {
        Self { repo, cache }
    }

    pub async fn create(&self, mut input: AuthorInput) -> Result<Author, ContentError> {
        validate(&mut input)?;
        let author = self.repo.create(&input).await.context("Failed to create author")?;

        invalidate_public(&self.cache).await;
        Ok(author)
    }

    pub async fn get(&self, id: i64) -> Result<Author, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| ContentError::NotFound(format!("Author {}", id)))
    }

    pub async fn list(&self, search: Option<&str>) -> Result<Vec<Author>, ContentError> {
        Ok(self.repo.list(search).await.context("Failed to list authors")?)
    }

    pub async fn update(&self, id: i64, mut input: AuthorInput) -> Result<Author, ContentError> {
        validate(&mut input)?;
        let author = self
            .repo
            .update(id, &input)
            .await
            .context("Failed to update author")?
            .ok_or_else(|| ContentError::NotFound(format!("Author {}", id)))?;

        // Article lists embed author names and pictures
        invalidate_public(&self.cache).await;
        Ok(author)
    }

    /// Delete an author; their articles keep existing without one
    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        if !self.repo.delete(id).await.context("Failed to delete author")? {
            return Err(ContentError::NotFound(format!("Author {}", id)));
        }

        invalidate_public(&self.cache).await;
        Ok(())
    }
}

fn validate(input: &mut AuthorInput) -> Result<(), ContentError> {
    require(&input.name, "name")?;
    max_chars(&input.name, "name", MAX_NAME_LEN)?;
    input.name = input.name.trim().to_string();
    blank_to_none(&mut input.picture);
    blank_to_none(&mut input.bio);
    Ok(())
}
