//! Public read API
//!
//! Projections served to the website. Only published articles and active
//! trainings/ebooks are visible; media paths are turned into URLs. The home
//! page aggregate is cached until the next content write.

use crate::cache::{keys, Cache};
use crate::db::repositories::{
    ArticleRepository, EbookRepository, ParagraphRepository, TestimonialRepository,
    TrainingRepository,
};
use crate::models::{
    ArticleWithAuthor, Ebook, MediaType, Paragraph, ParagraphFilter, Price, Testimonial, TestimonialFilter,
    Training, TrainingFilter,
};
use crate::services::content::ContentError;
use crate::services::media::MediaStorage;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicTestimonial {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub avatar: String,
    pub quote: String,
    pub rating: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicParagraph {
    pub id: i64,
    pub title: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub video_url: Option<String>,
    pub video_file: Option<String>,
    pub thumbnail: Option<String>,
    pub position: i64,
    pub file_size_mb: Option<f64>,
    pub media_type: MediaType,
}

/// Article card: no body, author flattened to name and picture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_name: Option<String>,
    pub author_picture: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAuthor {
    pub id: i64,
    pub name: String,
    pub picture: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub author: Option<PublicAuthor>,
    pub source_url: Option<String>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paragraphs: Vec<PublicParagraph>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub image: String,
    pub duration: Option<String>,
    pub price: Option<Price>,
    pub show_price: bool,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDetail {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub duration: Option<String>,
    pub price: Option<Price>,
    pub show_price: bool,
    pub image: String,
    pub video_url: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paragraphs: Vec<PublicParagraph>,
    pub position: i64,
}

/// Ebook card: the file is only exposed on the detail projection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbookSummary {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cover_image: String,
    pub is_active: bool,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EbookDetail {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub cover_image: String,
    pub file: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub position: i64,
}

/// Everything the home page shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomePage {
    pub articles: Vec<ArticleSummary>,
    pub testimonials: Vec<PublicTestimonial>,
    pub trainings: Vec<TrainingSummary>,
    pub ebooks: Vec<EbookSummary>,
}

pub struct CatalogService {
    article_repo: Arc<dyn ArticleRepository>,
    training_repo: Arc<dyn TrainingRepository>,
    ebook_repo: Arc<dyn EbookRepository>,
    testimonial_repo: Arc<dyn TestimonialRepository>,
    paragraph_repo: Arc<dyn ParagraphRepository>,
    media: Arc<MediaStorage>,
    cache: Arc<Cache>,
}

impl CatalogService {
    pub fn new(
        article_repo: Arc<dyn ArticleRepository>,
        training_repo: Arc<dyn TrainingRepository>,
        ebook_repo: Arc<dyn EbookRepository>,
        testimonial_repo: Arc<dyn TestimonialRepository>,
        paragraph_repo: Arc<dyn ParagraphRepository>,
        media: Arc<MediaStorage>,
        cache: Arc<Cache>,
    ) -> Self {
        Self {
            article_repo,
            training_repo,
            ebook_repo,
            testimonial_repo,
            paragraph_repo,
            media,
            cache,
        }
    }

    pub async fn home(&self) -> Result<HomePage, ContentError> {
        match self.cache.get::<HomePage>(keys::HOME).await {
            Ok(Some(home)) => return Ok(home),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read cached home page"),
        }

        let home = HomePage {
            articles: self.articles().await?,
            testimonials: self.testimonials().await?,
            trainings: self.trainings().await?,
            ebooks: self.ebooks().await?,
        };

        if let Err(e) = self.cache.set(keys::HOME, &home).await {
            tracing::warn!(error = %e, "Failed to cache home page");
        }
        Ok(home)
    }

    pub async fn testimonials(&self) -> Result<Vec<PublicTestimonial>, ContentError> {
        let testimonials = self
            .testimonial_repo
            .list(&TestimonialFilter::default())
            .await
            .context("Failed to list testimonials")?;
        Ok(testimonials.into_iter().map(|t| self.testimonial(t)).collect())
    }

    pub async fn testimonial_by_id(&self, id: i64) -> Result<PublicTestimonial, ContentError> {
        let testimonial = self
            .testimonial_repo
            .get_by_id(id)
            .await
            .context("Failed to get testimonial")?
            .ok_or_else(|| ContentError::NotFound(format!("Testimonial {}", id)))?;
        Ok(self.testimonial(testimonial))
    }

    /// Published articles, newest first
    pub async fn articles(&self) -> Result<Vec<ArticleSummary>, ContentError> {
        let articles = self
            .article_repo
            .list_published()
            .await
            .context("Failed to list published articles")?;
        Ok(articles.into_iter().map(|a| self.article_summary(a)).collect())
    }

    pub async fn article_by_id(&self, id: i64) -> Result<ArticleDetail, ContentError> {
        let article = self.article_repo.get_by_id(id).await.context("Failed to get article")?;
        self.published_article(article, || format!("Article {}", id)).await
    }

    pub async fn article_by_slug(&self, slug: &str) -> Result<ArticleDetail, ContentError> {
        let article = self
            .article_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get article")?;
        self.published_article(article, || format!("Article '{}'", slug)).await
    }

    /// Active trainings by position
    pub async fn trainings(&self) -> Result<Vec<TrainingSummary>, ContentError> {
        let trainings = self
            .training_repo
            .list(&TrainingFilter::active())
            .await
            .context("Failed to list trainings")?;
        Ok(trainings.into_iter().map(|t| self.training_summary(t)).collect())
    }

    pub async fn training_by_id(&self, id: i64) -> Result<TrainingDetail, ContentError> {
        let training = self.training_repo.get_by_id(id).await.context("Failed to get training")?;
        self.active_training(training, || format!("Training {}", id)).await
    }

    pub async fn training_by_slug(&self, slug: &str) -> Result<TrainingDetail, ContentError> {
        let training = self
            .training_repo
            .get_by_slug(slug)
            .await
            .context("Failed to get training")?;
        self.active_training(training, || format!("Training '{}'", slug)).await
    }

    /// Active ebooks by position
    pub async fn ebooks(&self) -> Result<Vec<EbookSummary>, ContentError> {
        let ebooks = self.ebook_repo.list(true).await.context("Failed to list ebooks")?;
        Ok(ebooks.into_iter().map(|e| self.ebook_summary(e)).collect())
    }

    pub async fn ebook_by_id(&self, id: i64) -> Result<EbookDetail, ContentError> {
        let ebook = self.ebook_repo.get_by_id(id).await.context("Failed to get ebook")?;
        self.active_ebook(ebook, || format!("Ebook {}", id))
    }

    pub async fn ebook_by_slug(&self, slug: &str) -> Result<EbookDetail, ContentError> {
        let ebook = self.ebook_repo.get_by_slug(slug).await.context("Failed to get ebook")?;
        self.active_ebook(ebook, || format!("Ebook '{}'", slug))
    }

    /// Every paragraph, by position
    pub async fn paragraphs(&self) -> Result<Vec<PublicParagraph>, ContentError> {
        let paragraphs = self
            .paragraph_repo
            .list(&ParagraphFilter::default())
            .await
            .context("Failed to list paragraphs")?;
        Ok(paragraphs.into_iter().map(|p| self.paragraph(p)).collect())
    }

    pub async fn paragraph_by_id(&self, id: i64) -> Result<PublicParagraph, ContentError> {
        let paragraph = self
            .paragraph_repo
            .get_by_id(id)
            .await
            .context("Failed to get paragraph")?
            .ok_or_else(|| ContentError::NotFound(format!("Paragraph {}", id)))?;
        Ok(self.paragraph(paragraph))
    }

    async fn published_article(
        &self,
        found: Option<ArticleWithAuthor>,
        label: impl FnOnce() -> String,
    ) -> Result<ArticleDetail, ContentError> {
        let ArticleWithAuthor { article, author } = match found {
            Some(a) if a.article.is_published => a,
            _ => return Err(ContentError::NotFound(label())),
        };

        let paragraphs = self
            .paragraph_repo
            .list_by_article(article.id)
            .await
            .context("Failed to list article paragraphs")?;

        Ok(ArticleDetail {
            id: article.id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            image: self.media.url_opt(article.image.as_deref()),
            author: author.map(|a| PublicAuthor {
                id: a.id,
                name: a.name,
                picture: self.media.url_opt(a.picture.as_deref()),
                bio: a.bio,
            }),
            source_url: article.source_url,
            is_published: article.is_published,
            created_at: article.created_at,
            published_at: article.published_at,
            updated_at: article.updated_at,
            paragraphs: paragraphs.into_iter().map(|p| self.paragraph(p)).collect(),
        })
    }

    async fn active_training(
        &self,
        found: Option<Training>,
        label: impl FnOnce() -> String,
    ) -> Result<TrainingDetail, ContentError> {
        let training = match found {
            Some(t) if t.is_active => t,
            _ => return Err(ContentError::NotFound(label())),
        };

        let paragraphs = self
            .paragraph_repo
            .list_by_training(training.id)
            .await
            .context("Failed to list training paragraphs")?;

        Ok(TrainingDetail {
            id: training.id,
            title: training.title,
            slug: training.slug,
            short_description: training.short_description,
            duration: training.duration,
            price: training.price,
            show_price: training.show_price,
            image: self.media.url(&training.image),
            video_url: training.video_url,
            is_active: training.is_active,
            created_at: training.created_at,
            updated_at: training.updated_at,
            paragraphs: paragraphs.into_iter().map(|p| self.paragraph(p)).collect(),
            position: training.position,
        })
    }

    fn active_ebook(&self, found: Option<Ebook>, label: impl FnOnce() -> String) -> Result<EbookDetail, ContentError> {
        let ebook = match found {
            Some(e) if e.is_active => e,
            _ => return Err(ContentError::NotFound(label())),
        };

        Ok(EbookDetail {
            id: ebook.id,
            title: ebook.title,
            slug: ebook.slug,
            description: ebook.description,
            cover_image: self.media.url(&ebook.cover_image),
            file: self.media.url(&ebook.file),
            is_active: ebook.is_active,
            created_at: ebook.created_at,
            position: ebook.position,
        })
    }

    fn testimonial(&self, t: Testimonial) -> PublicTestimonial {
        PublicTestimonial {
            id: t.id,
            name: t.name,
            role: t.role,
            avatar: self.media.url(&t.avatar),
            quote: t.quote,
            rating: t.rating,
        }
    }

    fn article_summary(&self, a: ArticleWithAuthor) -> ArticleSummary {
        let ArticleWithAuthor { article, author } = a;
        ArticleSummary {
            id: article.id,
            title: article.title,
            slug: article.slug,
            excerpt: article.excerpt,
            image: self.media.url_opt(article.image.as_deref()),
            published_at: article.published_at,
            author_picture: author
                .as_ref()
                .and_then(|a| self.media.url_opt(a.picture.as_deref())),
            author_name: author.map(|a| a.name),
            source_url: article.source_url,
        }
    }

    fn training_summary(&self, t: Training) -> TrainingSummary {
        TrainingSummary {
            id: t.id,
            title: t.title,
            slug: t.slug,
            short_description: t.short_description,
            image: self.media.url(&t.image),
            duration: t.duration,
            price: t.price,
            show_price: t.show_price,
            position: t.position,
        }
    }

    fn ebook_summary(&self, e: Ebook) -> EbookSummary {
        EbookSummary {
            id: e.id,
            title: e.title,
            slug: e.slug,
            description: e.description,
            cover_image: self.media.url(&e.cover_image),
            is_active: e.is_active,
            position: e.position,
        }
    }

    fn paragraph(&self, p: Paragraph) -> PublicParagraph {
        PublicParagraph {
            id: p.id,
            title: p.title,
            content: p.content,
            image: self.media.url_opt(p.image.as_deref()),
            video_url: p.video_url,
            video_file: self.media.url_opt(p.video_file.as_deref()),
            thumbnail: self.media.url_opt(p.thumbnail.as_deref()),
            position: p.position,
            file_size_mb: p.file_size_mb,
            media_type: p.media_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, invalidate_public};
    use crate::config::{CacheConfig, MediaConfig};
    use crate::db::repositories::{
        AuthorRepository, SqlxArticleRepository, SqlxAuthorRepository, SqlxEbookRepository,
        SqlxParagraphRepository, SqlxTestimonialRepository, SqlxTrainingRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::{
        ArticleInput, AuthorInput, EbookInput, ParagraphInput, TestimonialInput, TrainingInput,
    };

    struct Fixture {
        service: CatalogService,
        cache: Arc<Cache>,
        articles: Arc<dyn ArticleRepository>,
        authors: Arc<dyn AuthorRepository>,
        trainings: Arc<dyn TrainingRepository>,
        ebooks: Arc<dyn EbookRepository>,
        testimonials: Arc<dyn TestimonialRepository>,
        paragraphs: Arc<dyn ParagraphRepository>,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let articles = SqlxArticleRepository::boxed(pool.clone());
        let authors = SqlxAuthorRepository::boxed(pool.clone());
        let trainings = SqlxTrainingRepository::boxed(pool.clone());
        let ebooks = SqlxEbookRepository::boxed(pool.clone());
        let testimonials = SqlxTestimonialRepository::boxed(pool.clone());
        let paragraphs = SqlxParagraphRepository::boxed(pool);
        let media = Arc::new(MediaStorage::new(&MediaConfig::default()));

        Fixture {
            service: CatalogService::new(
                articles.clone(),
                trainings.clone(),
                ebooks.clone(),
                testimonials.clone(),
                paragraphs.clone(),
                media,
                cache.clone(),
            ),
            cache,
            articles,
            authors,
            trainings,
            ebooks,
            testimonials,
            paragraphs,
        }
    }

    fn article(title: &str, published: bool, author_id: Option<i64>) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            excerpt: format!("{} en bref", title),
            content: Some("Corps".to_string()),
            image: Some("articles/cover.jpg".to_string()),
            author_id,
            is_published: published,
            ..Default::default()
        }
    }

    fn training(title: &str, active: bool) -> TrainingInput {
        TrainingInput {
            title: title.to_string(),
            slug: None,
            short_description: "Deux jours".to_string(),
            duration: Some("2 jours".to_string()),
            price: Some("490".parse().unwrap()),
            show_price: true,
            image: "trainings/t.jpg".to_string(),
            video_url: None,
            is_active: active,
            position: 0,
        }
    }

    fn ebook(title: &str, active: bool) -> EbookInput {
        EbookInput {
            title: title.to_string(),
            slug: None,
            description: "Guide".to_string(),
            cover_image: "ebooks/covers/c.jpg".to_string(),
            file: "ebooks/files/g.pdf".to_string(),
            is_active: active,
            position: 0,
        }
    }

    #[tokio::test]
    async fn test_home_only_shows_public_content() {
        let f = setup().await;
        let author = f
            .authors
            .create(&AuthorInput {
                name: "Julie Martin".to_string(),
                picture: Some("authors/julie.jpg".to_string()),
                bio: None,
            })
            .await
            .unwrap();
        f.articles.create("publie", &article("Publié", true, Some(author.id))).await.unwrap();
        f.articles.create("brouillon", &article("Brouillon", false, None)).await.unwrap();
        f.trainings.create("active", &training("Active", true)).await.unwrap();
        f.trainings.create("inactive", &training("Inactive", false)).await.unwrap();
        f.ebooks.create("visible", &ebook("Visible", true)).await.unwrap();
        f.ebooks.create("cache", &ebook("Caché", false)).await.unwrap();
        f.testimonials
            .create(&TestimonialInput {
                name: "Paul".to_string(),
                role: "Investisseur".to_string(),
                avatar: "testimonials/paul.jpg".to_string(),
                quote: "Top".to_string(),
                rating: 5,
            })
            .await
            .unwrap();

        let home = f.service.home().await.unwrap();
        assert_eq!(home.articles.len(), 1);
        assert_eq!(home.articles[0].slug, "publie");
        assert_eq!(home.articles[0].author_name.as_deref(), Some("Julie Martin"));
        assert_eq!(home.articles[0].author_picture.as_deref(), Some("/media/authors/julie.jpg"));
        assert_eq!(home.articles[0].image.as_deref(), Some("/media/articles/cover.jpg"));
        assert_eq!(home.trainings.len(), 1);
        assert_eq!(home.trainings[0].slug, "active");
        assert_eq!(home.ebooks.len(), 1);
        assert_eq!(home.ebooks[0].cover_image, "/media/ebooks/covers/c.jpg");
        assert_eq!(home.testimonials.len(), 1);
        assert_eq!(home.testimonials[0].avatar, "/media/testimonials/paul.jpg");
    }

    #[tokio::test]
    async fn test_home_cached_until_invalidated() {
        let f = setup().await;
        assert!(f.service.home().await.unwrap().articles.is_empty());

        f.articles.create("nouveau", &article("Nouveau", true, None)).await.unwrap();
        assert!(f.service.home().await.unwrap().articles.is_empty());

        invalidate_public(&f.cache).await;
        assert_eq!(f.service.home().await.unwrap().articles.len(), 1);
    }

    #[tokio::test]
    async fn test_article_detail_embeds_paragraphs_by_position() {
        let f = setup().await;
        let created = f.articles.create("detail", &article("Détail", true, None)).await.unwrap();
        for (position, title) in [(2, "Second"), (1, "Premier")] {
            f.paragraphs
                .create(
                    &ParagraphInput {
                        title: Some(title.to_string()),
                        content: Some("Texte".to_string()),
                        position,
                        article_id: Some(created.id),
                        ..Default::default()
                    },
                    None,
                )
                .await
                .unwrap();
        }

        let detail = f.service.article_by_slug("detail").await.unwrap();
        assert_eq!(detail.id, created.id);
        assert!(detail.author.is_none());
        let titles: Vec<_> = detail.paragraphs.iter().map(|p| p.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Premier", "Second"]);

        let by_id = f.service.article_by_id(created.id).await.unwrap();
        assert_eq!(by_id, detail);
    }

    #[tokio::test]
    async fn test_hidden_content_is_not_found() {
        let f = setup().await;
        let draft = f.articles.create("brouillon", &article("Brouillon", false, None)).await.unwrap();
        f.trainings.create("inactive", &training("Inactive", false)).await.unwrap();
        f.ebooks.create("cache", &ebook("Caché", false)).await.unwrap();

        assert!(matches!(f.service.article_by_slug("brouillon").await, Err(ContentError::NotFound(_))));
        assert!(matches!(f.service.article_by_id(draft.id).await, Err(ContentError::NotFound(_))));
        assert!(matches!(f.service.training_by_slug("inactive").await, Err(ContentError::NotFound(_))));
        assert!(matches!(f.service.ebook_by_slug("cache").await, Err(ContentError::NotFound(_))));
        assert!(matches!(f.service.ebook_by_slug("absent").await, Err(ContentError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_ebook_detail_exposes_file() {
        let f = setup().await;
        let created = f.ebooks.create("guide", &ebook("Guide", true)).await.unwrap();

        let detail = f.service.ebook_by_id(created.id).await.unwrap();
        assert_eq!(detail.file, "/media/ebooks/files/g.pdf");

        let json = serde_json::to_value(&f.service.ebooks().await.unwrap()[0]).unwrap();
        assert!(json.get("file").is_none());
    }

    #[tokio::test]
    async fn test_training_price_serialized_as_string() {
        let f = setup().await;
        f.trainings.create("prix", &training("Prix", true)).await.unwrap();

        let detail = f.service.training_by_slug("prix").await.unwrap();
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["price"], "490.00");
        assert_eq!(json["image"], "/media/trainings/t.jpg");
    }
}
