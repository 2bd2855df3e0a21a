//! Article model
//!
//! Articles are written in the admin or imported from LinkedIn posts. Public
//! listings only show published articles, newest `published_at` first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Author;

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    /// URL-friendly unique slug
    pub slug: String,
    pub excerpt: String,
    /// Full body text
    pub content: Option<String>,
    /// Media path of the cover image
    pub image: Option<String>,
    pub author_id: Option<i64>,
    /// Original post URL for imported articles
    pub source_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Article joined with its author
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleWithAuthor {
    #[serde(flatten)]
    pub article: Article,
    pub author: Option<Author>,
}

/// Input for creating or replacing an article
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    /// Generated from the title when empty
    #[serde(default)]
    pub slug: Option<String>,
    pub excerpt: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub author_id: Option<i64>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
    /// Defaults to now
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

fn default_published() -> bool {
    true
}

/// Admin list filter for articles
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleFilter {
    /// Matches title, content or author name
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub author_id: Option<i64>,
}
