//! Copy the SQLite database into the backup directory and prune old copies.
//!
//! Usage: `backup-database` (reads `config.yml` or `$IMMOSHIFT_CONFIG`)

use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use immoshift::config::Config;
use immoshift::services::BackupJob;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "immoshift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::var_os("IMMOSHIFT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.yml"));
    let config = match Config::load_with_env(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Backup failed: {:#}", e);
            tracing::error!(error = ?e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    match BackupJob::new(&config.database, &config.backup).run().await {
        Ok(report) => {
            println!("Backup created: {}", report.backup_path.display());
            if report.removed > 0 {
                println!("Removed {} old backup(s)", report.removed);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Backup failed: {}", e);
            tracing::error!(error = %e, "Database backup failed");
            ExitCode::FAILURE
        }
    }
}
