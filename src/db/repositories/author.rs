//! Author repository
//!
//! Besides the repository trait, this module exposes executor-generic helpers
//! (`find_author_by_name`, `insert_author`) so the LinkedIn importer can run
//! them inside its transaction.

use crate::db::DynDatabasePool;
use crate::models::{Author, AuthorInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqliteExecutor};
use std::sync::Arc;

use super::search_pattern;

/// Author repository trait
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn create(&self, input: &AuthorInput) -> Result<Author>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>>;

    /// Exact name lookup, oldest author first when names collide
    async fn find_by_name(&self, name: &str) -> Result<Option<Author>>;

    /// List authors by name, optionally filtered by a name substring
    async fn list(&self, search: Option<&str>) -> Result<Vec<Author>>;

    /// Replace an author, returns `None` if it does not exist
    async fn update(&self, id: i64, input: &AuthorInput) -> Result<Option<Author>>;

    /// Delete an author, returns `false` if it did not exist
    async fn delete(&self, id: i64) -> Result<bool>;
}

/// SQLx-based author repository implementation
pub struct SqlxAuthorRepository {
    pool: DynDatabasePool,
}

impl SqlxAuthorRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn AuthorRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl AuthorRepository for SqlxAuthorRepository {
    async fn create(&self, input: &AuthorInput) -> Result<Author> {
        insert_author(self.pool.sqlite(), input).await
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Author>> {
        let row = sqlx::query("SELECT id, name, picture, bio FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool.sqlite())
            .await
            .context("Failed to get author by ID")?;

        Ok(row.as_ref().map(row_to_author))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Author>> {
        find_author_by_name(self.pool.sqlite(), name).await
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Author>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, picture, bio
            FROM authors
            WHERE (?1 IS NULL OR name LIKE ?1)
            ORDER BY name, id
            "#,
        )
        .bind(search_pattern(search))
        .fetch_all(self.pool.sqlite())
        .await
        .context("Failed to list authors")?;

        Ok(rows.iter().map(row_to_author).collect())
    }

    async fn update(&self, id: i64, input: &AuthorInput) -> Result<Option<Author>> {
        let result = sqlx::query("UPDATE authors SET name = ?, picture = ?, bio = ? WHERE id = ?")
            .bind(&input.name)
            .bind(&input.picture)
            .bind(&input.bio)
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to update author")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(self.pool.sqlite())
            .await
            .context("Failed to delete author")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Exact name lookup usable on a pool or inside a transaction
pub async fn find_author_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Author>>
where
    E: SqliteExecutor<'e>,
{
    let row = sqlx::query("SELECT id, name, picture, bio FROM authors WHERE name = ? ORDER BY id LIMIT 1")
        .bind(name)
        .fetch_optional(executor)
        .await
        .context("Failed to find author by name")?;

    Ok(row.as_ref().map(row_to_author))
}

/// Insert an author, usable on a pool or inside a transaction
pub async fn insert_author<'e, E>(executor: E, input: &AuthorInput) -> Result<Author>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("INSERT INTO authors (name, picture, bio) VALUES (?, ?, ?)")
        .bind(&input.name)
        .bind(&input.picture)
        .bind(&input.bio)
        .execute(executor)
        .await
        .context("Failed to create author")?;

    Ok(Author {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        picture: input.picture.clone(),
        bio: input.bio.clone(),
    })
}

fn row_to_author(row: &sqlx::sqlite::SqliteRow) -> Author {
    Author {
        id: row.get("id"),
        name: row.get("name"),
        picture: row.get("picture"),
        bio: row.get("bio"),
    }
}
