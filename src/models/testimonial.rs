//! Testimonial model

use serde::{Deserialize, Serialize};

/// Customer testimonial shown on the home page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: i64,
    pub name: String,
    pub role: String,
    /// Media path of the avatar image
    pub avatar: String,
    pub quote: String,
    /// Star rating, 1 to 5
    pub rating: i64,
}

/// Input for creating or replacing a testimonial
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonialInput {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub avatar: String,
    pub quote: String,
    #[serde(default = "default_rating")]
    pub rating: i64,
}

/// Admin list filter for testimonials
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestimonialFilter {
    /// Matches name, role or quote
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub rating: Option<i64>,
}

pub(crate) fn default_rating() -> i64 {
    5
}
