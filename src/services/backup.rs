//! SQLite backup job
//!
//! Copies the database file to `{dir}/{db_filename}_{YYYYmmdd_HHMMSS}.bak`
//! and prunes `.bak` files older than the retention period. Run from cron
//! through the `backup-database` binary.

use crate::config::{BackupConfig, DatabaseConfig};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;

/// Pause before copying so in-flight writes can finish
pub const GRACE_PERIOD: Duration = Duration::from_secs(1);

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Database file not found at {0}")]
    DatabaseNotFound(String),

    #[error("In-memory databases cannot be backed up")]
    InMemory,

    #[error("Backup failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackupReport {
    pub backup_path: PathBuf,
    /// Old backups deleted by the retention policy
    pub removed: usize,
}

pub struct BackupJob {
    database: Option<PathBuf>,
    dir: PathBuf,
    retention: Duration,
    grace: Duration,
}

impl BackupJob {
    pub fn new(database: &DatabaseConfig, backup: &BackupConfig) -> Self {
        Self {
            database: database.file_path(),
            dir: backup.dir.clone(),
            retention: Duration::from_secs(u64::from(backup.retention_days) * SECONDS_PER_DAY),
            grace: GRACE_PERIOD,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub async fn run(&self) -> Result<BackupReport, BackupError> {
        let database = self.database.as_deref().ok_or(BackupError::InMemory)?;
        if !fs::try_exists(database).await.unwrap_or(false) {
            return Err(BackupError::DatabaseNotFound(database.display().to_string()));
        }

        fs::create_dir_all(&self.dir).await?;
        let backup_path = self.dir.join(backup_file_name(database, Local::now()));

        tokio::time::sleep(self.grace).await;
        fs::copy(database, &backup_path).await?;
        tracing::info!(path = %backup_path.display(), "Database backed up");

        let removed = self.prune(SystemTime::now()).await?;
        if removed > 0 {
            tracing::info!(removed, "Removed old backups");
        }

        Ok(BackupReport { backup_path, removed })
    }

    /// Delete `.bak` files last modified before `now - retention`
    pub async fn prune(&self, now: SystemTime) -> Result<usize, BackupError> {
        let cutoff = now.checked_sub(self.retention).unwrap_or(SystemTime::UNIX_EPOCH);
        let mut removed = 0;

        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("bak") {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            if modified < cutoff {
                fs::remove_file(&path).await?;
                tracing::debug!(path = %path.display(), "Removed old backup");
                removed += 1;
            }
        }

        Ok(removed)
    }
}

/// `{db_filename}_{YYYYmmdd_HHMMSS}.bak`
pub fn backup_file_name(database: &Path, at: DateTime<Local>) -> String {
    let db_filename = database
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "database".to_string());
    format!("{}_{}.bak", db_filename, at.format("%Y%m%d_%H%M%S"))
}
