//! Ebook and lead models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Downloadable ebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ebook {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// Media path of the cover image
    pub cover_image: String,
    /// Media path of the PDF
    pub file: String,
    pub is_active: bool,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ebook with its number of recorded downloads (admin listing)
#[derive(Debug, Clone, Serialize)]
pub struct EbookWithStats {
    #[serde(flatten)]
    pub ebook: Ebook,
    pub download_count: i64,
}

/// Input for creating or replacing an ebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EbookInput {
    pub title: String,
    /// Generated from the title when empty
    #[serde(default)]
    pub slug: Option<String>,
    pub description: String,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub file: String,
    #[serde(default = "crate::models::training::default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub position: i64,
}

/// Admin list filter for ebooks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EbookFilter {
    /// Matches title or description
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Lead captured when a visitor downloads an ebook
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbookDownload {
    pub id: i64,
    pub ebook_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent_mailing: bool,
    pub download_date: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl EbookDownload {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Validated lead ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewEbookDownload {
    pub ebook_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub consent_mailing: bool,
    pub ip_address: Option<String>,
}

/// Lead joined with the title of its ebook (admin listing)
#[derive(Debug, Clone, Serialize)]
pub struct LeadWithEbook {
    #[serde(flatten)]
    pub lead: EbookDownload,
    pub ebook_title: String,
}

/// Admin list/export filter for leads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    /// Matches email, first name or last name
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub ebook_id: Option<i64>,
    #[serde(default)]
    pub consent_mailing: Option<bool>,
    /// Restrict to these lead ids
    #[serde(default)]
    pub ids: Option<Vec<i64>>,
}
