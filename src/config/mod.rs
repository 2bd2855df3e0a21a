//! Configuration management
//!
//! This module handles loading and parsing configuration for the Immoshift backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Media storage configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Outgoing email configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Public site information (sitemap, links)
    #[serde(default)]
    pub site: SiteConfig,
    /// Database backup job
    #[serde(default)]
    pub backup: BackupConfig,
    /// LinkedIn scraper
    #[serde(default)]
    pub scraper: ScraperConfig,
    /// Bootstrap admin account
    #[serde(default)]
    pub admin: AdminConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (for cookie-based auth)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or `sqlite:` URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/immoshift.db".to_string()
}

impl DatabaseConfig {
    /// Filesystem path of the SQLite database, `None` for in-memory databases.
    pub fn file_path(&self) -> Option<PathBuf> {
        let url = self.url.trim();
        if url == ":memory:" || url.starts_with("sqlite::memory:") {
            return None;
        }
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let path = path.split('?').next().unwrap_or(path);
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

/// Media storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory holding uploaded and imported files
    #[serde(default = "default_media_path")]
    pub path: PathBuf,
    /// URL prefix the media directory is served under
    #[serde(default = "default_media_url_prefix")]
    pub url_prefix: String,
    /// Maximum upload size in bytes (default: 100MB, video files included)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            path: default_media_path(),
            url_prefix: default_media_url_prefix(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_media_path() -> PathBuf {
    PathBuf::from("media")
}

fn default_media_url_prefix() -> String {
    "/media".to_string()
}

fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}

/// Outgoing email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Send emails at all; when disabled messages are only logged
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Receives a notification for every ebook download when set
    #[serde(default)]
    pub admin_email: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
            from_name: default_from_name(),
            admin_email: None,
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@immoshift.fr".to_string()
}

fn default_from_name() -> String {
    "Immoshift".to_string()
}

/// Public site information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute base URL of the public site, used for sitemap entries
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_site_name")]
    pub name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            name: default_site_name(),
        }
    }
}

fn default_base_url() -> String {
    "https://immoshift.fr".to_string()
}

fn default_site_name() -> String {
    "Immoshift".to_string()
}

/// Database backup job configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory receiving `.bak` copies
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
    /// Backups older than this many days are pruned
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_backup_dir(),
            retention_days: default_retention_days(),
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_retention_days() -> u32 {
    7
}

/// LinkedIn scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_scraper_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_scraper_timeout(),
        }
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}

fn default_scraper_timeout() -> u64 {
    30
}

/// Admin account created at startup when no user exists yet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern `IMMOSHIFT_<SECTION>_<KEY>`:
    /// - IMMOSHIFT_SERVER_HOST, IMMOSHIFT_SERVER_PORT, IMMOSHIFT_SERVER_CORS_ORIGIN
    /// - IMMOSHIFT_DATABASE_URL
    /// - IMMOSHIFT_CACHE_TTL_SECONDS
    /// - IMMOSHIFT_MEDIA_PATH, IMMOSHIFT_MEDIA_URL_PREFIX
    /// - IMMOSHIFT_EMAIL_ENABLED, IMMOSHIFT_EMAIL_SMTP_HOST, IMMOSHIFT_EMAIL_SMTP_PORT,
    ///   IMMOSHIFT_EMAIL_SMTP_USERNAME, IMMOSHIFT_EMAIL_SMTP_PASSWORD,
    ///   IMMOSHIFT_EMAIL_FROM_ADDRESS, IMMOSHIFT_EMAIL_ADMIN_EMAIL
    /// - IMMOSHIFT_SITE_BASE_URL
    /// - IMMOSHIFT_BACKUP_DIR, IMMOSHIFT_BACKUP_RETENTION_DAYS
    /// - IMMOSHIFT_ADMIN_USERNAME, IMMOSHIFT_ADMIN_EMAIL, IMMOSHIFT_ADMIN_PASSWORD
    pub fn load_with_env(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("IMMOSHIFT_SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse::<u16>("IMMOSHIFT_SERVER_PORT") {
            self.server.port = port;
        }
        if let Ok(cors_origin) = std::env::var("IMMOSHIFT_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(url) = std::env::var("IMMOSHIFT_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(ttl) = env_parse::<u64>("IMMOSHIFT_CACHE_TTL_SECONDS") {
            self.cache.ttl_seconds = ttl;
        }

        // Media configuration
        if let Ok(path) = std::env::var("IMMOSHIFT_MEDIA_PATH") {
            self.media.path = PathBuf::from(path);
        }
        if let Ok(prefix) = std::env::var("IMMOSHIFT_MEDIA_URL_PREFIX") {
            self.media.url_prefix = prefix;
        }

        // Email configuration
        if let Some(enabled) = env_parse::<bool>("IMMOSHIFT_EMAIL_ENABLED") {
            self.email.enabled = enabled;
        }
        if let Ok(host) = std::env::var("IMMOSHIFT_EMAIL_SMTP_HOST") {
            self.email.smtp_host = host;
        }
        if let Some(port) = env_parse::<u16>("IMMOSHIFT_EMAIL_SMTP_PORT") {
            self.email.smtp_port = port;
        }
        if let Ok(username) = std::env::var("IMMOSHIFT_EMAIL_SMTP_USERNAME") {
            self.email.smtp_username = username;
        }
        if let Ok(password) = std::env::var("IMMOSHIFT_EMAIL_SMTP_PASSWORD") {
            self.email.smtp_password = password;
        }
        if let Ok(from) = std::env::var("IMMOSHIFT_EMAIL_FROM_ADDRESS") {
            self.email.from_address = from;
        }
        if let Ok(admin_email) = std::env::var("IMMOSHIFT_EMAIL_ADMIN_EMAIL") {
            self.email.admin_email = Some(admin_email).filter(|s| !s.trim().is_empty());
        }

        if let Ok(base_url) = std::env::var("IMMOSHIFT_SITE_BASE_URL") {
            self.site.base_url = base_url;
        }

        // Backup configuration
        if let Ok(dir) = std::env::var("IMMOSHIFT_BACKUP_DIR") {
            self.backup.dir = PathBuf::from(dir);
        }
        if let Some(days) = env_parse::<u32>("IMMOSHIFT_BACKUP_RETENTION_DAYS") {
            self.backup.retention_days = days;
        }

        // Admin bootstrap
        if let Ok(username) = std::env::var("IMMOSHIFT_ADMIN_USERNAME") {
            self.admin.username = Some(username);
        }
        if let Ok(email) = std::env::var("IMMOSHIFT_ADMIN_EMAIL") {
            self.admin.email = Some(email);
        }
        if let Ok(password) = std::env::var("IMMOSHIFT_ADMIN_PASSWORD") {
            self.admin.password = Some(password);
        }
    }
}

/// Read and parse an environment variable, ignoring invalid values
fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for all config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
