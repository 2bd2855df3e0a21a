//! Data models
//!
//! Database entities of the Immoshift backend and the inputs used to
//! create or replace them.

mod article;
mod author;
mod ebook;
mod paragraph;
mod testimonial;
pub(crate) mod training;
mod user;

pub use article::{Article, ArticleFilter, ArticleInput, ArticleWithAuthor};
pub use author::{Author, AuthorInput};
pub use ebook::{Ebook, EbookDownload, EbookFilter, EbookInput, EbookWithStats, LeadFilter, LeadWithEbook, NewEbookDownload};
pub use paragraph::{MediaType, Paragraph, ParagraphFilter, ParagraphInput};
pub use testimonial::{Testimonial, TestimonialFilter, TestimonialInput};
pub use training::{Price, PriceError, Training, TrainingFilter, TrainingInput};
pub use user::{CreateUserInput, Session, User};
