//! Testimonial repository

use crate::db::DynDatabasePool;
use crate::models::{Testimonial, TestimonialFilter, TestimonialInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;

use super::search_pattern;

/// Testimonial repository trait
#[async_trait]
pub trait TestimonialRepository: Send + Sync {
    async fn create(&self, input: &TestimonialInput) -> Result<Testimonial>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Testimonial>>;

    /// List testimonials, optionally filtered on name, role or quote
    async fn list(&self, filter: &TestimonialFilter) -> Result<Vec<Testimonial>>;

    async fn update(&self, id: i64, input: &TestimonialInput) -> Result<Option<Testimonial>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based testimonial repository implementation
pub struct SqlxTestimonialRepository {
    pool: DynDatabasePool,
}

impl SqlxTestimonialRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TestimonialRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TestimonialRepository for SqlxTestimonialRepository {
    async fn create(&self, input: &TestimonialInput) -> Result<Testimonial> {
        let result = sqlx::query(
            "INSERT INTO testimonials (name, role, avatar, quote, rating) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(&input.role)
        .bind(&input.avatar)
        .bind(&input.quote)
        .bind(input.rating)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to create testimonial")?;

        Ok(Testimonial {
            id: result.last_insert_rowid(),
            name: input.name.clone(),
            role: input.role.clone(),
            avatar: input.avatar.clone(),
            quote: input.quote.clone(),
            rating: input.rating,
        })
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Testimonial>> {
        let row = sqlx::query(
            "SELECT id, name, role, avatar, quote, rating FROM testimonials WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool.sqlite())
        .await
        .context("Failed to get testimonial by ID")?;

        Ok(row.as_ref().map(row_to_testimonial))
    }

    async fn list(&self, filter: &TestimonialFilter) -> Result<Vec<Testimonial>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, role, avatar, quote, rating
            FROM testimonials
            WHERE (?1 IS NULL OR name LIKE ?1 OR role LIKE ?1 OR quote LIKE ?1)
              AND (?2 IS NULL OR rating = ?2)
            ORDER BY id
            "#,
        )
        .bind(search_pattern(filter.search.as_deref()))
        .bind(filter.rating)
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list testimonials")?;

        Ok(rows.iter().map(row_to_testimonial).collect())
    }

    async fn update(&self, id: i64, input: &TestimonialInput) -> Result<Option<Testimonial>> {
        let result = sqlx::query(
            "UPDATE testimonials SET name = ?, role = ?, avatar = ?, quote = ?, rating = ? WHERE id = ?",
        )
        .bind(&input.name)
        .bind(&input.role)
        .bind(&input.avatar)
        .bind(&input.quote)
        .bind(input.rating)
        .bind(id)
        .execute(self.pool.sqlite())
        .await
        .context("Failed to update testimonial")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM testimonials WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete testimonial")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_testimonial(row: &sqlx::sqlite::SqliteRow) -> Testimonial {
    Testimonial {
        id: row.get("id"),
        name: row.get("name"),
        role: row.get("role"),
        avatar: row.get("avatar"),
        quote: row.get("quote"),
        rating: row.get("rating"),
    }
}
