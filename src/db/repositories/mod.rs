//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles CRUD operations for a specific entity.

pub mod article;
pub mod author;
pub mod ebook;
pub mod ebook_download;
pub mod paragraph;
pub mod session;
pub mod testimonial;
pub mod training;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use author::{AuthorRepository, SqlxAuthorRepository};
pub use ebook::{EbookRepository, SqlxEbookRepository};
pub use ebook_download::{EbookDownloadRepository, SqlxEbookDownloadRepository};
pub use paragraph::{ParagraphRepository, SqlxParagraphRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use testimonial::{SqlxTestimonialRepository, TestimonialRepository};
pub use training::{SqlxTrainingRepository, TrainingRepository};
pub use user::{SqlxUserRepository, UserRepository};

/// Build a `LIKE` pattern from an admin search term, `None` when blank
pub(crate) fn search_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t))
}
