//! Author model

use serde::{Deserialize, Serialize};

/// Article author, shared across articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    /// Display name (max 100 chars)
    pub name: String,
    /// Media path of the profile picture
    pub picture: Option<String>,
    pub bio: Option<String>,
}

/// Input for creating or replacing an author
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}
