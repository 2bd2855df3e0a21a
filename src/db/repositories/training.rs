//! Training repository

use crate::db::DynDatabasePool;
use crate::models::{Price, Training, TrainingFilter, TrainingInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::search_pattern;

const SELECT_TRAINING: &str = r#"
    SELECT id, title, slug, short_description, duration, price, show_price, image,
           video_url, is_active, position, created_at, updated_at
    FROM trainings
"#;

/// Training repository trait
#[async_trait]
pub trait TrainingRepository: Send + Sync {
    /// Create a training; `slug` must already be resolved
    async fn create(&self, slug: &str, input: &TrainingInput) -> Result<Training>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Training>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Training>>;

    /// List trainings ordered by position, then id
    async fn list(&self, filter: &TrainingFilter) -> Result<Vec<Training>>;

    async fn update(&self, id: i64, slug: &str, input: &TrainingInput) -> Result<Option<Training>>;

    async fn delete(&self, id: i64) -> Result<bool>;

    /// Check if a slug is used, optionally ignoring one training
    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;
}

/// SQLx-based training repository implementation
pub struct SqlxTrainingRepository {
    pool: DynDatabasePool,
}

impl SqlxTrainingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TrainingRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TrainingRepository for SqlxTrainingRepository {
    async fn create(&self, slug: &str, input: &TrainingInput) -> Result<Training> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO trainings (title, slug, short_description, duration, price, show_price, image,
                                   video_url, is_active, position, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.short_description)
        .bind(&input.duration)
        .bind(input.price.map(|p| p.to_string()))
        .bind(input.show_price)
        .bind(&input.image)
        .bind(&input.video_url)
        .bind(input.is_active)
        .bind(input.position)
        .bind(now)
        .bind(now)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create training")?;

        Ok(Training {
            id: result.last_insert_rowid(),
            title: input.title.clone(),
            slug: slug.to_string(),
            short_description: input.short_description.clone(),
            duration: input.duration.clone(),
            price: input.price,
            show_price: input.show_price,
            image: input.image.clone(),
            video_url: input.video_url.clone(),
            is_active: input.is_active,
            position: input.position,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Training>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_TRAINING))
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get training by ID")?;

        row.as_ref().map(row_to_training).transpose()
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Training>> {
        let row = sqlx::query(&format!("{} WHERE slug = ?", SELECT_TRAINING))
            .bind(slug)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get training by slug")?;

        row.as_ref().map(row_to_training).transpose()
    }

    async fn list(&self, filter: &TrainingFilter) -> Result<Vec<Training>> {
        let rows = sqlx::query(&format!(
            r#"{}
            WHERE (?1 IS NULL OR is_active = ?1)
              AND (?2 IS NULL OR show_price = ?2)
              AND (?3 IS NULL OR title LIKE ?3 OR short_description LIKE ?3)
            ORDER BY position, id
            "#,
            SELECT_TRAINING
        ))
        .bind(filter.is_active)
        .bind(filter.show_price)
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list trainings")?;

        rows.iter().map(row_to_training).collect()
    }

    async fn update(&self, id: i64, slug: &str, input: &TrainingInput) -> Result<Option<Training>> {
        let result = sqlx::query(
            r#"
            UPDATE trainings
            SET title = ?, slug = ?, short_description = ?, duration = ?, price = ?, show_price = ?,
                image = ?, video_url = ?, is_active = ?, position = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&input.title)
        .bind(slug)
        .bind(&input.short_description)
        .bind(&input.duration)
        .bind(input.price.map(|p| p.to_string()))
        .bind(input.show_price)
        .bind(&input.image)
        .bind(&input.video_url)
        .bind(input.is_active)
        .bind(input.position)
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update training")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM trainings WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete training")?;

        Ok(result.rows_affected() > 0)
    }

    async fn slug_exists(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM trainings WHERE slug = ? AND (? IS NULL OR id != ?)",
        )
        .bind(slug)
        .bind(exclude_id)
        .bind(exclude_id)
        .fetch_one(self.pool.sqlite())
        .await
        .context("Failed to check training slug")?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }
}

fn row_to_training(row: &sqlx::sqlite::SqliteRow) -> Result<Training> {
    let price: Option<String> = row.get("price");
    let price = price
        .map(|p| p.parse::<Price>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid stored price: {}", e))?;

    Ok(Training {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        short_description: row.get("short_description"),
        duration: row.get("duration"),
        price,
        show_price: row.get("show_price"),
        image: row.get("image"),
        video_url: row.get("video_url"),
        is_active: row.get("is_active"),
        position: row.get("position"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
