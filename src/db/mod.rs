//! Database layer
//!
//! SQLite storage for the Immoshift content backend.
//!
//! # Usage
//!
//! ```ignore
//! use immoshift::config::DatabaseConfig;
//! use immoshift::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool, SqliteDatabase};
