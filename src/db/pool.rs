//! Database connection pool
//!
//! The backend stores everything in a single SQLite file so that the backup
//! job can copy it as-is. The `DatabasePool` trait keeps the rest of the code
//! independent from how the pool is built.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::DatabaseConfig;

/// Database pool trait shared by repositories and services.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Execute a raw SQL query that doesn't return rows
    async fn execute(&self, query: &str) -> Result<u64>;

    /// Check if the database connection is healthy
    async fn ping(&self) -> Result<()>;

    /// Close the connection pool
    async fn close(&self);

    /// Get the underlying SQLite pool
    fn sqlite(&self) -> &SqlitePool;

    /// Path of the database file, `None` for in-memory databases
    fn file_path(&self) -> Option<&Path>;
}

/// SQLite connection pool implementation
pub struct SqliteDatabase {
    pool: SqlitePool,
    path: Option<PathBuf>,
}

impl SqliteDatabase {
    /// Create a new SQLite connection pool
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let path = config.file_path();

        let pool = match &path {
            Some(path) => {
                // Create parent directory if it doesn't exist
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).with_context(|| {
                            format!("Failed to create database directory: {:?}", parent)
                        })?;
                    }
                }

                let options = SqliteConnectOptions::new()
                    .filename(path)
                    .create_if_missing(true)
                    .foreign_keys(true);

                SqlitePoolOptions::new()
                    .max_connections(20)
                    .connect_with(options)
                    .await
                    .with_context(|| {
                        format!("Failed to connect to SQLite database: {}", config.url)
                    })?
            }
            None => {
                // Every in-memory connection is its own database, so keep exactly one alive
                let options = SqliteConnectOptions::from_str("sqlite::memory:")
                    .context("Invalid in-memory SQLite URL")?
                    .foreign_keys(true);

                SqlitePoolOptions::new()
                    .max_connections(1)
                    .min_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect_with(options)
                    .await
                    .context("Failed to open in-memory SQLite database")?
            }
        };

        Ok(Self { pool, path })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn sqlite(&self) -> &SqlitePool {
        &self.pool
    }

    fn file_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Type alias for a boxed database pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Create a database connection pool based on configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let db = SqliteDatabase::new(config).await?;
    Ok(Arc::new(db))
}

/// Create a SQLite in-memory database pool for testing
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}
