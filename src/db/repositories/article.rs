//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite
//! - `insert_article`, usable inside the LinkedIn import transaction
//!
//! Reads join the author so list and detail projections need one query.

use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleFilter, ArticleInput, ArticleWithAuthor, Author};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteExecutor};
use std::sync::Arc;

use super::search_pattern;

const SELECT_ARTICLE: &str = r#"
    SELECT a.id, a.title, a.slug, a.excerpt, a.content, a.image, a.author_id, a.source_url,
           a.is_published, a.created_at, a.published_at, a.updated_at,
           au.name AS author_name, au.picture AS author_picture, au.bio AS author_bio
    FROM articles a
    LEFT JOIN authors au ON au.id = a.author_id
"#;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Create an article; `slug` must already be resolved
    async fn create(&self, slug: &str, input: &ArticleInput) -> Result<Article>;

    async fn get_by_id(&self, id: i64) -> Result<Option<ArticleWithAuthor>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<ArticleWithAuthor>>;

    /// Published articles, newest `published_at` first
    async fn list_published(&self) -> Result<Vec<ArticleWithAuthor>>;

    /// Admin listing, newest `published_at` first
    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleWithAuthor>>;

    async fn update(&self, id: i64, slug: &str, input: &ArticleInput) -> Result<Option<Article>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if a slug is used, optionally ignoring one article
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based article repository implementation
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn create(&self, slug: &str, input: &ArticleInput) -> Result<Article> {
        insert_article(self.pool.sqlite(), slug, input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<ArticleWithAuthor>> {
        let row = sqlx::query(&format!("{} WHERE a.id = ?", SELECT_ARTICLE))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get article by ID")?;

        Ok(row.as_ref().map(row_to_article_with_author))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<ArticleWithAuthor>> {
        let row = sqlx::query(&format!("{} WHERE a.slug = ?", SELECT_ARTICLE))
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get article by slug")?;

        Ok(row.as_ref().map(row_to_article_with_author))
    }

    async fn list_published(&self) -> Result<Vec<ArticleWithAuthor>> {
        self.list(&ArticleFilter {
            is_published: Some(true),
            ..Default::default()
        })
        .await
    }

    async fn list(&self, filter: &ArticleFilter) -> Result<Vec<ArticleWithAuthor>> {
        let rows = sqlx::query(&format!(
            r#"{}
            WHERE (?1 IS NULL OR a.is_published = ?1)
              AND (?2 IS NULL OR a.author_id = ?2)
              AND (?3 IS NULL OR a.title LIKE ?3 OR a.content LIKE ?3 OR au.name LIKE ?3)
            ORDER BY a.published_at DESC, a.id DESC
            "#,
            SELECT_ARTICLE
        ))
        .bind(filter.is_published)
        .bind(filter.author_id)
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list articles")?;

        Ok(rows.iter().map(row_to_article_with_author).collect())
    }

    async fn update(&self, id: i64, slug: &str, input: &ArticleInput) -> Result<Option<Article>> {
        let existing = match self.get_by_id(id).await? {
            Some(existing) => existing.article,
            None => return Ok(None),
        };
        let published_at = input.published_at.unwrap_or(existing.published_at);

        sqlx::query(
            r#"
            UPDATE articles
            SET title = ?, slug = ?, excerpt = ?, content = ?, image = ?, author_id = ?,
                source_url = ?, is_published = ?, published_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.excerpt)
        .bind(&input.content)
        .bind(&input.image)
        .bind(input.author_id)
        .bind(&input.source_url)
        .bind(input.is_published)
        .bind(published_at)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update article")?;

        Ok(self.get_by_id(id).await?.map(|a| a.article))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Paragraphs are removed by ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM articles WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete article")?;

        Ok(result.rows_affected() > 0)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        article_slug_exists(self.pool.sqlite(), slug, exclude_id).await
    }
}

/// Insert an article, usable on a pool or inside a transaction
pub async fn insert_article<'e, E>(executor: E, slug: &str, input: &ArticleInput) -> Result<Article>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now();
    let published_at = input.published_at.unwrap_or(now);

    let result = sqlx::query(
        r#"
        INSERT INTO articles (title, slug, excerpt, content, image, author_id, source_url,
                              is_published, created_at, published_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(slug)
    .bind(&input.excerpt)
    .bind(&input.content)
    .bind(&input.image)
    .bind(input.author_id)
    .bind(&input.source_url)
    .bind(input.is_published)
    .bind(now)
    .bind(published_at)
    .bind(now)
    .execute(executor)
    .await
    .context("Failed to create article")?;

    Ok(Article {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        slug: slug.to_string(),
        excerpt: input.excerpt.clone(),
        content: input.content.clone(),
        image: input.image.clone(),
        author_id: input.author_id,
        source_url: input.source_url.clone(),
        is_published: input.is_published,
        created_at: now,
        published_at,
        updated_at: now,
    })
}

/// Slug lookup usable on a pool or inside a transaction
pub async fn article_slug_exists<'e, E>(executor: E, slug: &str, exclude_id: Option<i64>) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query(
        "SELECT COUNT(*) as count FROM articles WHERE slug = ? AND (? IS NULL OR id != ?)",
    )
    .bind(slug)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_one(executor)
    .await
    .context("Failed to check article slug")?;

    let count: i64 = row.get("count");
    Ok(count > 0)
}

fn row_to_article_with_author(row: &sqlx::sqlite::SqliteRow) -> ArticleWithAuthor {
    let article = Article {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        content: row.get("content"),
        image: row.get("image"),
        author_id: row.get("author_id"),
        source_url: row.get("source_url"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
        published_at: row.get("published_at"),
        updated_at: row.get("updated_at"),
    };

    let author_name: Option<String> = row.get("author_name");
    let author = match (article.author_id, author_name) {
        (Some(id), Some(name)) => Some(Author {
            id,
            name,
            picture: row.get("author_picture"),
            bio: row.get("author_bio"),
        }),
        _ => None,
    };

    ArticleWithAuthor { article, author }
}
