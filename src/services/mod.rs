//! Services layer - Business logic
//!
//! This module contains the business rules of the Immoshift backend.
//! Services are responsible for:
//! - Validating admin input and generating slugs
//! - Coordinating between repositories, media storage and cache
//! - Talking to the outside world (LinkedIn, SMTP)

pub mod article;
pub mod author;
pub mod backup;
pub mod catalog;
pub mod content;
pub mod ebook;
pub mod email;
pub mod image_fetch;
pub mod importer;
pub mod lead;
pub mod linkedin;
pub mod media;
pub mod paragraph;
pub mod password;
pub mod sitemap;
pub mod slug;
pub mod testimonial;
pub mod training;
pub mod user;

pub use article::ArticleService;
pub use author::AuthorService;
pub use backup::{BackupError, BackupJob, BackupReport};
pub use catalog::{CatalogService, HomePage};
pub use content::ContentError;
pub use ebook::EbookService;
pub use email::{create_mailer, EmailNotifier, Mailer};
pub use importer::{ImportError, ImportRequest, ImportSummary, LinkedInImporter};
pub use lead::{LeadError, LeadService, LeadSubmission};
pub use linkedin::{LinkedInScraper, ScrapeError, ScrapedPost};
pub use media::{MediaError, MediaKind, MediaStorage};
pub use paragraph::{ParagraphError, ParagraphService};
pub use password::{hash_password, verify_password};
pub use sitemap::{SitemapSection, SitemapService};
pub use slug::generate_slug;
pub use testimonial::TestimonialService;
pub use training::TrainingService;
pub use user::{LoginInput, UserService, UserServiceError};
