//! Ebook repository

use crate::db::DynDatabasePool;
use crate::models::{Ebook, EbookFilter, EbookInput, EbookWithStats};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::search_pattern;

const SELECT_EBOOK: &str = r#"
    SELECT e.id, e.title, e.slug, e.description, e.cover_image, e.file, e.is_active,
           e.position, e.created_at, e.updated_at
    FROM ebooks e
"#;

/// Ebook repository trait
#[async_trait]
pub trait EbookRepository: Send + Sync {
    /// Create an ebook; `slug` must already be resolved
    async fn create(&self, slug: &str, input: &EbookInput) -> Result<Ebook>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Ebook>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Ebook>>;

    /// List ebooks ordered by position, then id
    async fn list(&self, active_only: bool) -> Result<Vec<Ebook>>;

    /// Admin listing with download counts
    async fn list_with_stats(&self, filter: &EbookFilter) -> Result<Vec<EbookWithStats>>;

    async fn update(&self, id: i64, slug: &str, input: &EbookInput) -> Result<Option<Ebook>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based ebook repository implementation
pub struct SqlxEbookRepository {
    pool: DynDatabasePool,
}

impl SqlxEbookRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn EbookRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl EbookRepository for SqlxEbookRepository {
    async fn create(&self, slug: &str, input: &EbookInput) -> Result<Ebook> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO ebooks (title, slug, description, cover_image, file, is_active, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(&input.file)
        .bind(input.is_active)
        .bind(input.position)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create ebook")?;

        Ok(Ebook {
            id: result.last_insert_rowid(),
            title: input.title.clone(),
            slug: slug.to_string(),
            description: input.description.clone(),
            cover_image: input.cover_image.clone(),
            file: input.file.clone(),
            is_active: input.is_active,
            position: input.position,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Ebook>> {
        let row = sqlx::query(&format!("{} WHERE e.id = ?", SELECT_EBOOK))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get ebook by ID")?;

        Ok(row.as_ref().map(row_to_ebook))
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Ebook>> {
        let row = sqlx::query(&format!("{} WHERE e.slug = ?", SELECT_EBOOK))
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get ebook by slug")?;

        Ok(row.as_ref().map(row_to_ebook))
    }

    async fn list(&self, active_only: bool) -> Result<Vec<Ebook>> {
        let rows = sqlx::query(&format!(
            "{} WHERE (? = 0 OR e.is_active = 1) ORDER BY e.position, e.id",
            SELECT_EBOOK
        ))
        .bind(active_only)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list ebooks")?;

        Ok(rows.iter().map(row_to_ebook).collect())
    }

    async fn list_with_stats(&self, filter: &EbookFilter) -> Result<Vec<EbookWithStats>> {
        let rows = sqlx::query(
            r#"
            SELECT e.id, e.title, e.slug, e.description, e.cover_image, e.file, e.is_active,
                   e.position, e.created_at, e.updated_at,
                   (SELECT COUNT(*) FROM ebook_downloads d WHERE d.ebook_id = e.id) AS download_count
            FROM ebooks e
            WHERE (?1 IS NULL OR e.title LIKE ?1 OR e.description LIKE ?1)
              AND (?2 IS NULL OR e.is_active = ?2)
            ORDER BY e.position, e.id
            "#,
        )
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.is_active)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list ebooks with stats")?;

        Ok(rows
            .iter()
            .map(|row| EbookWithStats {
                ebook: row_to_ebook(row),
                download_count: row.get("download_count"),
            })
            .collect())
    }

    async fn update(&self, id: i64, slug: &str, input: &EbookInput) -> Result<Option<Ebook>> {
        let result = sqlx::query(
            r#"
            UPDATE ebooks
            SET title = ?, slug = ?, description = ?, cover_image = ?, file = ?, is_active = ?,
                position = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.description)
        .bind(&input.cover_image)
        .bind(&input.file)
        .bind(input.is_active)
        .bind(input.position)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update ebook")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // Leads are removed by ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM ebooks WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete ebook")?;

        Ok(result.rows_affected() > 0)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM ebooks WHERE slug = ? AND (? IS NULL OR id != ?)",
        )
        .bind(slug)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check ebook slug")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

fn row_to_ebook(row: &sqlx::sqlite::SqliteRow) -> Ebook {
    Ebook {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        cover_image: row.get("cover_image"),
        file: row.get("file"),
        is_active: row.get("is_active"),
        position: row.get("position"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
