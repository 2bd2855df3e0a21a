//! Database migrations module
//!
//! All migrations are embedded directly in Rust code as SQL strings so that
//! the server binary can bring an empty SQLite file up to date on startup.
//!
//! # Usage
//!
//! ```ignore
//! use immoshift::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::DynDatabasePool;

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements
    pub up: &'static str,
}

/// Migration record stored in the database
#[derive(Debug, Clone)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// All migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                email VARCHAR(254) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_authors",
        up: r#"
            CREATE TABLE IF NOT EXISTS authors (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                picture VARCHAR(255),
                bio TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_authors_name ON authors(name);
        "#,
    },
    Migration {
        version: 4,
        name: "create_testimonials",
        up: r#"
            CREATE TABLE IF NOT EXISTS testimonials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(100) NOT NULL,
                role VARCHAR(100) NOT NULL,
                avatar VARCHAR(255) NOT NULL DEFAULT '',
                quote TEXT NOT NULL,
                rating INTEGER NOT NULL DEFAULT 5 CHECK (rating BETWEEN 1 AND 5)
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_trainings",
        up: r#"
            CREATE TABLE IF NOT EXISTS trainings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                short_description TEXT NOT NULL,
                duration VARCHAR(50),
                price TEXT,
                show_price BOOLEAN NOT NULL DEFAULT 1,
                image VARCHAR(255) NOT NULL DEFAULT '',
                video_url VARCHAR(200),
                is_active BOOLEAN NOT NULL DEFAULT 1,
                position INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_trainings_position ON trainings(position, id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_articles",
        up: r#"
            CREATE TABLE IF NOT EXISTS articles (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                excerpt TEXT NOT NULL,
                content TEXT,
                image VARCHAR(255),
                author_id INTEGER REFERENCES authors(id) ON DELETE SET NULL,
                source_url VARCHAR(200),
                is_published BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL,
                published_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_articles_published_at ON articles(published_at);
            CREATE INDEX IF NOT EXISTS idx_articles_author_id ON articles(author_id);
        "#,
    },
    Migration {
        version: 7,
        name: "create_paragraphs",
        up: r#"
            CREATE TABLE IF NOT EXISTS paragraphs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200),
                content TEXT,
                media_type VARCHAR(20) NOT NULL DEFAULT 'none',
                image VARCHAR(255),
                video_url VARCHAR(200),
                video_file VARCHAR(255),
                thumbnail VARCHAR(255),
                file_size_mb REAL,
                position INTEGER NOT NULL DEFAULT 0,
                article_id INTEGER REFERENCES articles(id) ON DELETE CASCADE,
                training_id INTEGER REFERENCES trainings(id) ON DELETE CASCADE,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_paragraphs_article_id ON paragraphs(article_id);
            CREATE INDEX IF NOT EXISTS idx_paragraphs_training_id ON paragraphs(training_id);
        "#,
    },
    Migration {
        version: 8,
        name: "create_ebooks",
        up: r#"
            CREATE TABLE IF NOT EXISTS ebooks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(200) NOT NULL,
                slug VARCHAR(200) NOT NULL UNIQUE,
                description TEXT NOT NULL,
                cover_image VARCHAR(255) NOT NULL DEFAULT '',
                file VARCHAR(255) NOT NULL DEFAULT '',
                is_active BOOLEAN NOT NULL DEFAULT 1,
                position INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMP NOT NULL,
                updated_at TIMESTAMP NOT NULL
            );
        "#,
    },
    Migration {
        version: 9,
        name: "create_ebook_downloads",
        up: r#"
            CREATE TABLE IF NOT EXISTS ebook_downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ebook_id INTEGER NOT NULL REFERENCES ebooks(id) ON DELETE CASCADE,
                first_name VARCHAR(100) NOT NULL,
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(254) NOT NULL,
                phone VARCHAR(20),
                consent_mailing BOOLEAN NOT NULL DEFAULT 0,
                download_date TIMESTAMP NOT NULL,
                ip_address VARCHAR(45)
            );
            CREATE INDEX IF NOT EXISTS idx_ebook_downloads_ebook_id ON ebook_downloads(ebook_id);
            CREATE INDEX IF NOT EXISTS idx_ebook_downloads_download_date ON ebook_downloads(download_date);
        "#,
    },
];

/// Run all pending migrations
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;

    let applied = get_applied_migrations(pool.sqlite()).await?;
    let applied_versions: Vec<i32> = applied.iter().map(|m| m.version as i32).collect();

    let mut count = 0;

    for migration in MIGRATIONS {
        if !applied_versions.contains(&migration.version) {
            tracing::info!(
                "Applying migration {}: {}",
                migration.version,
                migration.name
            );
            apply_migration(pool.sqlite(), migration)
                .await
                .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

/// Create the migrations tracking table if it doesn't exist
async fn create_migrations_table(pool: &DynDatabasePool) -> Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name VARCHAR(255) NOT NULL UNIQUE,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .await?;
    Ok(())
}

async fn get_applied_migrations(pool: &SqlitePool) -> Result<Vec<MigrationRecord>> {
    let rows = sqlx::query("SELECT version, name, applied_at FROM _migrations ORDER BY version")
        .fetch_all(pool)
        .await?;

    let mut records = Vec::new();
    for row in rows {
        records.push(MigrationRecord {
            version: row.get("version"),
            name: row.get("name"),
            applied_at: row.get("applied_at"),
        });
    }

    Ok(records)
}

async fn apply_migration(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    let mut tx = pool.begin().await?;

    for statement in split_sql_statements(migration.up) {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute: {}", truncate_sql(statement)))?;
    }

    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Truncate SQL for error messages
fn truncate_sql(sql: &str) -> String {
    match sql.char_indices().nth(100) {
        Some((idx, _)) => format!("{}...", &sql[..idx]),
        None => sql.to_string(),
    }
}

/// Split SQL into individual statements, skipping comment-only fragments
fn split_sql_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty() && !is_comment_only(stmt))
        .collect()
}

/// Check if a string contains only SQL comments
fn is_comment_only(s: &str) -> bool {
    s.lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with("--"))
}

/// Get pending migrations count
pub async fn pending_count(pool: &DynDatabasePool) -> Result<usize> {
    create_migrations_table(pool).await?;
    let applied = get_applied_migrations(pool.sqlite()).await?;
    Ok(MIGRATIONS.len().saturating_sub(applied.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    #[tokio::test]
    async fn test_run_migrations_is_idempotent() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());

        let applied_again = run_migrations(&pool).await.expect("Failed to rerun migrations");
        assert_eq!(applied_again, 0);
        assert_eq!(pending_count(&pool).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_pending_count_before_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        assert_eq!(pending_count(&pool).await.unwrap(), MIGRATIONS.len());
    }

    #[tokio::test]
    async fn test_all_tables_created() {
        let pool = migrated_pool().await;

        for table in [
            "users",
            "sessions",
            "authors",
            "testimonials",
            "trainings",
            "articles",
            "paragraphs",
            "ebooks",
            "ebook_downloads",
        ] {
            let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(pool.sqlite())
                .await
                .expect("Failed to query sqlite_master");
            assert!(row.is_some(), "table {} missing", table);
        }
    }

    #[tokio::test]
    async fn test_rating_check_constraint() {
        let pool = migrated_pool().await;

        let result = sqlx::query(
            "INSERT INTO testimonials (name, role, quote, rating) VALUES ('A', 'B', 'C', 6)",
        )
        .execute(pool.sqlite())
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_article_delete_cascades_to_paragraphs() {
        let pool = migrated_pool().await;
        let db = pool.sqlite();

        sqlx::query(
            "INSERT INTO articles (id, title, slug, excerpt, created_at, published_at, updated_at)
             VALUES (1, 'T', 't', 'e', '2024-01-01', '2024-01-01', '2024-01-01')",
        )
        .execute(db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO paragraphs (content, article_id, created_at, updated_at)
             VALUES ('body', 1, '2024-01-01', '2024-01-01')",
        )
        .execute(db)
        .await
        .unwrap();

        sqlx::query("DELETE FROM articles WHERE id = 1")
            .execute(db)
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM paragraphs")
            .fetch_one(db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_author_delete_nulls_article_reference() {
        let pool = migrated_pool().await;
        let db = pool.sqlite();

        sqlx::query("INSERT INTO authors (id, name) VALUES (1, 'Jane')")
            .execute(db)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO articles (title, slug, excerpt, author_id, created_at, published_at, updated_at)
             VALUES ('T', 't', 'e', 1, '2024-01-01', '2024-01-01', '2024-01-01')",
        )
        .execute(db)
        .await
        .unwrap();

        sqlx::query("DELETE FROM authors WHERE id = 1")
            .execute(db)
            .await
            .unwrap();

        let author_id: Option<i64> = sqlx::query_scalar("SELECT author_id FROM articles")
            .fetch_one(db)
            .await
            .unwrap();
        assert!(author_id.is_none());
    }

    #[tokio::test]
    async fn test_ebook_download_requires_existing_ebook() {
        let pool = migrated_pool().await;

        let result = sqlx::query(
            "INSERT INTO ebook_downloads (ebook_id, first_name, last_name, email, download_date)
             VALUES (42, 'A', 'B', 'a@b.fr', '2024-01-01')",
        )
        .execute(pool.sqlite())
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_split_sql_statements() {
        let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
        assert_eq!(split_sql_statements(sql).len(), 2);

        let sql_with_comments = "-- Comment\nCREATE TABLE a (id INT);";
        assert_eq!(split_sql_statements(sql_with_comments).len(), 1);
    }

    #[test]
    fn test_is_comment_only() {
        assert!(is_comment_only("-- This is a comment"));
        assert!(is_comment_only("-- Line 1\n-- Line 2"));
        assert!(!is_comment_only("CREATE TABLE test"));
        assert!(!is_comment_only("-- Comment\nCREATE TABLE test"));
    }
}
