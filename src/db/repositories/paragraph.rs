//! Paragraph repository
//!
//! Stores already validated paragraphs. Media normalization happens in
//! `services::paragraph` before anything reaches this layer.

use crate::db::DynDatabasePool;
use crate::models::{MediaType, Paragraph, ParagraphFilter, ParagraphInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqliteExecutor};
use std::sync::Arc;

use super::search_pattern;

const SELECT_PARAGRAPH: &str = r#"
    SELECT id, title, content, media_type, image, video_url, video_file, thumbnail,
           file_size_mb, position, article_id, training_id, created_at, updated_at
    FROM paragraphs
"#;

/// Paragraph repository trait
#[async_trait]
pub trait ParagraphRepository: Send + Sync {
    async fn create(&self, input: &ParagraphInput, file_size_mb: Option<f64>) -> Result<Paragraph>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Paragraph>>;

    /// Paragraphs matching the filter, ordered by position
    async fn list(&self, filter: &ParagraphFilter) -> Result<Vec<Paragraph>>;

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Paragraph>>;

    async fn list_by_training(&self, training_id: i64) -> Result<Vec<Paragraph>>;

    async fn update(
        &self,
        id: i64,
        input: &ParagraphInput,
        file_size_mb: Option<f64>,
    ) -> Result<Option<Paragraph>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based paragraph repository implementation
pub struct SqlxParagraphRepository {
    pool: DynDatabasePool,
}

impl SqlxParagraphRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ParagraphRepository> {
        Arc::new(Self::new(pool))
    }

    async fn fetch_where(&self, clause: &str, id: i64) -> Result<Vec<Paragraph>> {
        let rows = sqlx::query(&format!("{} {} ORDER BY position, id", SELECT_PARAGRAPH, clause))
            .bind(id)
            .fetch_all(self.pool.sqlite())
            .await
            .context("Failed to list paragraphs")?;

        rows.iter().map(row_to_paragraph).collect()
    }
}

#[async_trait]
impl ParagraphRepository for SqlxParagraphRepository {
    async fn create(&self, input: &ParagraphInput, file_size_mb: Option<f64>) -> Result<Paragraph> {
        insert_paragraph(self.pool.sqlite(), input, file_size_mb).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Paragraph>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PARAGRAPH))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get paragraph by ID")?;

        row.as_ref().map(row_to_paragraph).transpose()
    }

    async fn list(&self, filter: &ParagraphFilter) -> Result<Vec<Paragraph>> {
        let rows = sqlx::query(&format!(
            r#"{}
            WHERE (?1 IS NULL OR article_id = ?1)
              AND (?2 IS NULL OR training_id = ?2)
              AND (?3 IS NULL OR media_type = ?3)
              AND (?4 IS NULL OR title LIKE ?4 OR content LIKE ?4)
            ORDER BY position, id
            "#,
            SELECT_PARAGRAPH
        ))
        .bind(filter.article_id)
        .bind(filter.training_id)
        .bind(filter.media_type.map(|m| m.as_str()))
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list paragraphs")?;

        rows.iter().map(row_to_paragraph).collect()
    }

    async fn list_by_article(&self, article_id: i64) -> Result<Vec<Paragraph>> {
        self.fetch_where("WHERE article_id = ?1", article_id).await
    }

    async fn list_by_training(&self, training_id: i64) -> Result<Vec<Paragraph>> {
        self.fetch_where("WHERE training_id = ?1", training_id).await
    }

    async fn update(
        &self,
        id: i64,
        input: &ParagraphInput,
        file_size_mb: Option<f64>,
    ) -> Result<Option<Paragraph>> {
        let result = sqlx::query(
            r#"
            UPDATE paragraphs
            SET title = ?, content = ?, media_type = ?, image = ?, video_url = ?, video_file = ?,
                thumbnail = ?, file_size_mb = ?, position = ?, article_id = ?, training_id = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.media_type.as_str())
        .bind(&input.image)
        .bind(&input.video_url)
        .bind(&input.video_file)
        .bind(&input.thumbnail)
        .bind(file_size_mb)
        .bind(input.position)
        .bind(input.article_id)
        .bind(input.training_id)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update paragraph")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM paragraphs WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete paragraph")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Insert a paragraph, usable on a pool or inside a transaction
pub async fn insert_paragraph<'e, E>(
    executor: E,
    input: &ParagraphInput,
    file_size_mb: Option<f64>,
) -> Result<Paragraph>
where
    E: SqliteExecutor<'e>,
{
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO paragraphs (title, content, media_type, image, video_url, video_file, thumbnail,
                                file_size_mb, position, article_id, training_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.media_type.as_str())
    .bind(&input.image)
    .bind(&input.video_url)
    .bind(&input.video_file)
    .bind(&input.thumbnail)
    .bind(file_size_mb)
    .bind(input.position)
    .bind(input.article_id)
    .bind(input.training_id)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await
    .context("Failed to create paragraph")?;

    Ok(Paragraph {
        id: result.last_insert_rowid(),
        title: input.title.clone(),
        content: input.content.clone(),
        media_type: input.media_type,
        image: input.image.clone(),
        video_url: input.video_url.clone(),
        video_file: input.video_file.clone(),
        thumbnail: input.thumbnail.clone(),
        file_size_mb,
        position: input.position,
        article_id: input.article_id,
        training_id: input.training_id,
        created_at: now,
        updated_at: now,
    })
}

fn row_to_paragraph(row: &sqlx::sqlite::SqliteRow) -> Result<Paragraph> {
    let media_type: String = row.get("media_type");
    let media_type = media_type
        .parse::<MediaType>()
        .map_err(|e| anyhow::anyhow!(e))?;

    Ok(Paragraph {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        media_type,
        image: row.get("image"),
        video_url: row.get("video_url"),
        video_file: row.get("video_file"),
        thumbnail: row.get("thumbnail"),
        file_size_mb: row.get("file_size_mb"),
        position: row.get("position"),
        article_id: row.get("article_id"),
        training_id: row.get("training_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
