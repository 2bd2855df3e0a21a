//! LinkedIn post import
//!
//! Creates an article (with its author and a single paragraph holding the
//! full text) from a public LinkedIn post. Database writes happen in one
//! transaction; images stored for a failed import are removed again.

use crate::cache::{invalidate_public, Cache};
use crate::db::repositories::article::{article_slug_exists, insert_article};
use crate::db::repositories::author::{find_author_by_name, insert_author};
use crate::db::repositories::paragraph::insert_paragraph;
use crate::db::DynDatabasePool;
use crate::models::{Article, ArticleInput, Author, AuthorInput, ParagraphInput};
use crate::services::content::{is_http_url, is_unique_violation};
use crate::services::image_fetch::download_image;
use crate::services::linkedin::{is_linkedin_post_url, LinkedInScraper, ScrapeError, ScrapedPost};
use crate::services::media::{MediaKind, MediaStorage};
use crate::services::slug::resolve_slug;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

pub const ERR_REQUIRED: &str = "Ce champ est obligatoire.";
pub const ERR_INVALID_URL: &str = "Saisissez une URL valide.";
pub const ERR_NOT_LINKEDIN: &str =
    "L'URL doit être celle d'un post LinkedIn (https://www.linkedin.com/posts/...).";

const URL_MAX_LEN: usize = 500;
const AUTHOR_NAME_MAX: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error("Un article avec le slug '{0}' existe déjà.")]
    DuplicateSlug(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Import form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRequest {
    #[serde(default)]
    pub linkedin_url: String,
}

impl ImportRequest {
    /// Check the URL before any network access, returns it trimmed
    pub fn validate(&self) -> Result<String, ImportError> {
        let url = self.linkedin_url.trim();
        if url.is_empty() {
            return Err(ImportError::Validation(ERR_REQUIRED.to_string()));
        }
        let len = url.chars().count();
        if len > URL_MAX_LEN {
            return Err(ImportError::Validation(format!(
                "Assurez-vous que cette valeur comporte au plus {} caractères (actuellement {}).",
                URL_MAX_LEN, len
            )));
        }
        if !is_http_url(url) {
            return Err(ImportError::Validation(ERR_INVALID_URL.to_string()));
        }
        if !is_linkedin_post_url(url) {
            return Err(ImportError::Validation(ERR_NOT_LINKEDIN.to_string()));
        }
        Ok(url.to_string())
    }
}

/// What an import created
#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub article: Article,
    pub author: Author,
    pub author_created: bool,
    pub paragraph_id: i64,
}

pub struct LinkedInImporter {
    pool: DynDatabasePool,
    scraper: LinkedInScraper,
    media: Arc<MediaStorage>,
    cache: Arc<Cache>,
}

impl LinkedInImporter {
    pub fn new(pool: DynDatabasePool, scraper: LinkedInScraper, media: Arc<MediaStorage>, cache: Arc<Cache>) -> Self {
        Self {
            pool,
            scraper,
            media,
            cache,
        }
    }

    pub async fn import(&self, request: &ImportRequest) -> Result<ImportSummary, ImportError> {
        let url = request.validate()?;
        let post = self.scraper.scrape(&url).await?;
        self.import_post(post).await
    }

    /// Store an already scraped post
    pub async fn import_post(&self, post: ScrapedPost) -> Result<ImportSummary, ImportError> {
        let slug = resolve_slug(None, &post.title).ok_or_else(|| {
            ImportError::Validation("Impossible de générer un slug à partir du titre du post.".to_string())
        })?;
        let author_name: String = post.author_name.trim().chars().take(AUTHOR_NAME_MAX).collect();

        let known_author = find_author_by_name(self.pool.sqlite(), &author_name)
            .await
            .context("Failed to look up post author")?
            .is_some();

        let mut stored = Vec::new();
        let image = self
            .store_image(&post.source_url, post.image_url.as_deref(), MediaKind::Article, &mut stored)
            .await;
        let author_picture = if known_author {
            None
        } else {
            self.store_image(&post.source_url, post.author_image_url.as_deref(), MediaKind::Author, &mut stored)
                .await
        };

        match self.persist(&post, &slug, &author_name, image, author_picture).await {
            Ok(summary) => {
                invalidate_public(&self.cache).await;
                tracing::info!(
                    article_id = summary.article.id,
                    slug = %summary.article.slug,
                    source_url = %post.source_url,
                    author_created = summary.author_created,
                    "LinkedIn post imported"
                );
                Ok(summary)
            }
            Err(e) => {
                for path in &stored {
                    if let Err(err) = self.media.delete(path).await {
                        tracing::warn!(path = %path, error = %err, "Failed to remove imported media");
                    }
                }
                tracing::warn!(source_url = %post.source_url, error = %e, "LinkedIn import failed");
                Err(e)
            }
        }
    }

    async fn store_image(
        &self,
        page_url: &str,
        src: Option<&str>,
        kind: MediaKind,
        stored: &mut Vec<String>,
    ) -> Option<String> {
        let url = resolve_image_url(page_url, src?)?;
        let image = download_image(self.scraper.client(), &url).await?;
        match self.media.save_file(kind, &image.filename, image.file.path()).await {
            Ok(path) => {
                stored.push(path.clone());
                Some(path)
            }
            Err(e) => {
                tracing::warn!(kind = %kind, error = %e, "Failed to store downloaded image");
                None
            }
        }
    }

    async fn persist(
        &self,
        post: &ScrapedPost,
        slug: &str,
        author_name: &str,
        image: Option<String>,
        author_picture: Option<String>,
    ) -> Result<ImportSummary, ImportError> {
        let mut tx = self
            .pool
            .sqlite()
            .begin()
            .await
            .context("Failed to begin import transaction")?;

        if article_slug_exists(&mut *tx, slug, None).await? {
            return Err(ImportError::DuplicateSlug(slug.to_string()));
        }

        let (author, author_created) = match find_author_by_name(&mut *tx, author_name).await? {
            Some(author) => (author, false),
            None => {
                let input = AuthorInput {
                    name: author_name.to_string(),
                    picture: author_picture,
                    bio: Some(post.author_headline.clone()).filter(|h| !h.is_empty()),
                };
                (insert_author(&mut *tx, &input).await?, true)
            }
        };

        let input = ArticleInput {
            title: post.title.clone(),
            slug: Some(slug.to_string()),
            excerpt: post.excerpt.clone(),
            content: Some(post.content.clone()),
            image,
            author_id: Some(author.id),
            source_url: Some(post.source_url.clone()),
            is_published: true,
            published_at: Some(post.published_at),
        };
        let article = insert_article(&mut *tx, slug, &input).await.map_err(|e| {
            if is_unique_violation(&e) {
                ImportError::DuplicateSlug(slug.to_string())
            } else {
                ImportError::Internal(e)
            }
        })?;

        let paragraph = insert_paragraph(
            &mut *tx,
            &ParagraphInput {
                content: Some(post.content.clone()),
                position: 0,
                article_id: Some(article.id),
                ..Default::default()
            },
            None,
        )
        .await?;

        tx.commit().await.context("Failed to commit import transaction")?;

        Ok(ImportSummary {
            article,
            author,
            author_created,
            paragraph_id: paragraph.id,
        })
    }
}

/// Absolute http(s) URL of an image found on the post page. Relative
/// `src` values resolve against the page URL.
fn resolve_image_url(page_url: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let url = match Url::parse(src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url).ok()?.join(src).ok()?,
        Err(_) => return None,
    };
    if matches!(url.scheme(), "http" | "https") {
        Some(url.into())
    } else {
        tracing::debug!(src, "Skipping non-http image");
        None
    }
}
