//! Article service
//!
//! Admin-side business logic for articles:
//! - Create, read, update, delete
//! - Slug generation and uniqueness
//! - Public cache invalidation

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::{ArticleRepository, AuthorRepository};
use crate::models::{Article, ArticleFilter, ArticleInput, ArticleWithAuthor};
use crate::services::content::{
    blank_to_none, is_unique_violation, max_chars, optional_url, require, ContentError,
};
use crate::services::slug::resolve_slug;
use anyhow::Context;
use std::sync::Arc;

const MAX_TITLE_LEN: usize = 200;

/// Article service for managing blog articles
pub struct ArticleService {
    repo: Arc<dyn ArticleRepository>,
    author_repo: Arc<dyn AuthorRepository>,
    cache: Arc<Cache>,
}

impl ArticleService {
    pub fn new(
        repo: Arc<dyn ArticleRepository>,
        author_repo: Arc<dyn AuthorRepository>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            repo,
            author_repo,
            cache,
        }
    }

    /// Create an article, generating the slug from the title when omitted
    pub async fn create(&self, mut input: ArticleInput) -> Result<Article, ContentError> {
        self.validate(&mut input).await?;
        let slug = self.unique_slug(&input, None).await?;

        let article = self.repo.create(&slug, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                ContentError::DuplicateSlug(slug.clone())
            } else {
                e.into()
            }
        })?;

        invalidate_public(&self.cache).await;
        tracing::info!(article_id = article.id, slug = %article.slug, "Article created");
        Ok(article)
    }

    pub async fn get(&self, id: i64) -> Result<ArticleWithAuthor, ContentError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get article")?
            .ok_or_else(|| ContentError::NotFound(format!("Article {}", id)))
    }

    /// Admin listing, newest first
    pub async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleWithAuthor>, ContentError> {
        Ok(self.repo.list(filter).await.context("Failed to list articles")?)
    }

    /// Replace an article
    pub async fn update(&self, id: i64, mut input: ArticleInput) -> Result<Article, ContentError> {
        self.validate(&mut input).await?;
        let slug = self.unique_slug(&input, Some(id)).await?;

        let article = self
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
            .ok_or_else(|| ContentError::NotFound(format!("Article {}", id)))?;

        invalidate_public(&self.cache).await;
        Ok(article)
    }

    /// Delete an article and, through the foreign key, its paragraphs
    pub async fn delete(&self, id: i64) -> Result<(), ContentError> {
        let deleted = self.repo.delete(id).await.context("Failed to delete article")?;
        if !deleted {
            return Err(ContentError::NotFound(format!("Article {}", id)));
        }

        invalidate_public(&self.cache).await;
        tracing::info!(article_id = id, "Article deleted");
        Ok(())
    }

    async fn validate(&self, input: &mut ArticleInput) -> Result<(), ContentError> {
        require(&input.title, "title")?;
        max_chars(&input.title, "title", MAX_TITLE_LEN)?;
        require(&input.excerpt, "excerpt")?;
        optional_url(input.source_url.as_deref(), "source_url")?;

        blank_to_none(&mut input.content);
        blank_to_none(&mut input.image);
        blank_to_none(&mut input.source_url);

        if let Some(author_id) = input.author_id {
            let exists = self
                .author_repo
                .get_by_id(author_id)
                .await
                .context("Failed to get author")?
                .is_some();
            if !exists {
                return Err(ContentError::ValidationError(format!(
                    "Author {} does not exist",
                    author_id
                )));
            }
        }
        Ok(())
    }

    async fn unique_slug(&self, input: &ArticleInput, exclude_id: Option<i64>) -> Result<String, ContentError> {
        let slug = resolve_slug(input.slug.as_deref(), &input.title)
            .ok_or_else(|| ContentError::ValidationError("slug cannot be empty".to_string()))?;

        if self
            .repo
            .slug_exists(&slug, exclude_id)
            .await
            .context("Failed to check article slug")?
        {
            return Err(ContentError::DuplicateSlug(slug));
        }
        Ok(slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, keys};
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxArticleRepository, SqlxAuthorRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::AuthorInput;

    async fn setup_test_service() -> (ArticleService, Arc<dyn AuthorRepository>, Arc<Cache>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let service = ArticleService::new(
            SqlxArticleRepository::boxed(pool),
            author_repo.clone(),
            cache.clone(),
        );
        (service, author_repo, cache)
    }

    fn input(title: &str) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            excerpt: "Résumé".to_string(),
            is_published: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_generates_slug() {
        let (service, _, _) = setup_test_service().await;

        let article = service.create(input("Acheter en 2024 : le guide")).await.unwrap();
        assert_eq!(article.slug, "acheter-en-2024-le-guide");
    }

    #[tokio::test]
    async fn test_create_duplicate_slug() {
        let (service, _, _) = setup_test_service().await;
        service.create(input("Même titre")).await.unwrap();

        let result = service.create(input("Même titre")).await;
        assert!(matches!(result, Err(ContentError::DuplicateSlug(s)) if s == "meme-titre"));
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (service, _, _) = setup_test_service().await;

        let result = service.create(input("   ")).await;
        assert!(matches!(result, Err(ContentError::ValidationError(_))));

        let result = service.create(input(&"a".repeat(201))).await;
        assert!(matches!(result, Err(ContentError::ValidationError(_))));

        let mut bad_author = input("Avec auteur");
        bad_author.author_id = Some(42);
        let result = service.create(bad_author).await;
        assert!(matches!(result, Err(ContentError::ValidationError(_))));

        let mut bad_url = input("Avec source");
        bad_url.source_url = Some("not a url".to_string());
        assert!(service.create(bad_url).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_own_slug_and_embeds_author() {
        let (service, author_repo, _) = setup_test_service().await;
        let author = author_repo
            .create(&AuthorInput {
                name: "Julie Martin".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let created = service.create(input("Titre")).await.unwrap();
        let mut changed = input("Titre");
        changed.author_id = Some(author.id);
        let updated = service.update(created.id, changed).await.unwrap();
        assert_eq!(updated.slug, "titre");

        let loaded = service.get(created.id).await.unwrap();
        assert_eq!(loaded.author.map(|a| a.name).as_deref(), Some("Julie Martin"));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let (service, _, _) = setup_test_service().await;

        assert!(matches!(service.update(99, input("X")).await, Err(ContentError::NotFound(_))));
        assert!(matches!(service.delete(99).await, Err(ContentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_writes_invalidate_public_cache() {
        let (service, _, cache) = setup_test_service().await;
        cache.set(keys::HOME, &"stale").await.unwrap();

        service.create(input("Nouveau")).await.unwrap();
        assert!(cache.get::<String>(keys::HOME).await.unwrap().is_none());
    }
}
