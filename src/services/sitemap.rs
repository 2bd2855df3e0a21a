//! XML sitemap of the public site
//!
//! Four sections: `articles` (published), `trainings` and `ebooks` (active)
//! and `static` (home page). The full sitemap lists them in that order.
//! Rendered documents are cached until the next content write.

use crate::cache::{keys, Cache};
use crate::db::repositories::{ArticleRepository, EbookRepository, TrainingRepository};
use crate::models::TrainingFilter;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Escape text for XML/HTML element content and attribute values
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapSection {
    Articles,
    Trainings,
    Ebooks,
    Static,
}

impl SitemapSection {
    pub const ALL: [SitemapSection; 4] = [
        SitemapSection::Articles,
        SitemapSection::Trainings,
        SitemapSection::Ebooks,
        SitemapSection::Static,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SitemapSection::Articles => "articles",
            SitemapSection::Trainings => "trainings",
            SitemapSection::Ebooks => "ebooks",
            SitemapSection::Static => "static",
        }
    }
}

impl fmt::Display for SitemapSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SitemapSection {
    type Err = String;

    /// Accepts `articles` as well as `articles.xml`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_suffix(".xml").unwrap_or(s) {
            "articles" => Ok(SitemapSection::Articles),
            "trainings" => Ok(SitemapSection::Trainings),
            "ebooks" => Ok(SitemapSection::Ebooks),
            "static" => Ok(SitemapSection::Static),
            other => Err(format!("Unknown sitemap section: {}", other)),
        }
    }
}

/// One `<url>` entry
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub changefreq: &'static str,
    pub priority: &'static str,
}

/// Render a `<urlset>` document
pub fn render_urlset(urls: &[SitemapUrl]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for url in urls {
        xml.push_str("<url><loc>");
        xml.push_str(&escape_xml(&url.loc));
        xml.push_str("</loc>");
        if let Some(lastmod) = url.lastmod {
            xml.push_str(&format!("<lastmod>{}</lastmod>", lastmod.format("%Y-%m-%d")));
        }
        xml.push_str(&format!(
            "<changefreq>{}</changefreq><priority>{}</priority></url>\n",
            url.changefreq, url.priority
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

pub struct SitemapService {
    article_repo: Arc<dyn ArticleRepository>,
    training_repo: Arc<dyn TrainingRepository>,
    ebook_repo: Arc<dyn EbookRepository>,
    cache: Arc<Cache>,
    base_url: String,
}

impl SitemapService {
    pub fn new(
        article_repo: Arc<dyn ArticleRepository>,
        training_repo: Arc<dyn TrainingRepository>,
        ebook_repo: Arc<dyn EbookRepository>,
        cache: Arc<Cache>,
        base_url: &str,
    ) -> Self {
        Self {
            article_repo,
            training_repo,
            ebook_repo,
            cache,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Every section in one document
    pub async fn render_all(&self) -> Result<String> {
        self.cached("all", || async {
            let mut urls = Vec::new();
            for section in SitemapSection::ALL {
                urls.extend(self.urls(section).await?);
            }
            Ok(render_urlset(&urls))
        })
        .await
    }

    pub async fn render_section(&self, section: SitemapSection) -> Result<String> {
        self.cached(section.as_str(), || async {
            Ok(render_urlset(&self.urls(section).await?))
        })
        .await
    }

    /// Entries of one section with absolute locations
    pub async fn urls(&self, section: SitemapSection) -> Result<Vec<SitemapUrl>> {
        let entry = |path: String,
                     lastmod: Option<DateTime<Utc>>,
                     changefreq: &'static str,
                     priority: &'static str| SitemapUrl {
            loc: format!("{}{}", self.base_url, path),
            lastmod,
            changefreq,
            priority,
        };

        let urls = match section {
            SitemapSection::Static => vec![entry("/".to_string(), None, "monthly", "0.5")],
            SitemapSection::Articles => self
                .article_repo
                .list_published()
                .await
                .context("Failed to list articles for sitemap")?
                .into_iter()
                .map(|a| {
                    entry(
                        format!("/articles/{}/", a.article.slug),
                        Some(a.article.updated_at),
                        "weekly",
                        "0.8",
                    )
                })
                .collect(),
            SitemapSection::Trainings => self
                .training_repo
                .list(&TrainingFilter::active())
                .await
                .context("Failed to list trainings for sitemap")?
                .into_iter()
                .map(|t| entry(format!("/training/{}/", t.slug), Some(t.updated_at), "monthly", "0.9"))
                .collect(),
            SitemapSection::Ebooks => self
                .ebook_repo
                .list(true)
                .await
                .context("Failed to list ebooks for sitemap")?
                .into_iter()
                .map(|e| entry(format!("/ebooks/{}/", e.slug), Some(e.updated_at), "monthly", "0.7"))
                .collect(),
        };
        Ok(urls)
    }

    async fn cached<F, Fut>(&self, name: &str, render: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        let key = keys::sitemap(name);
        if let Ok(Some(xml)) = self.cache.get::<String>(&key).await {
            return Ok(xml);
        }

        let xml = render().await?;
        if let Err(e) = self.cache.set(&key, &xml).await {
            tracing::warn!(key = %key, error = %e, "Failed to cache sitemap");
        }
        Ok(xml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{create_cache, invalidate_public};
    use crate::config::CacheConfig;
    use crate::db::repositories::{SqlxArticleRepository, SqlxEbookRepository, SqlxTrainingRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{ArticleInput, TrainingInput};

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&#x27;");
    }

    #[test]
    fn test_section_parsing() {
        assert_eq!("articles".parse::<SitemapSection>().unwrap(), SitemapSection::Articles);
        assert_eq!("static.xml".parse::<SitemapSection>().unwrap(), SitemapSection::Static);
        assert!("users".parse::<SitemapSection>().is_err());
    }

    #[test]
    fn test_render_urlset() {
        let xml = render_urlset(&[SitemapUrl {
            loc: "https://immoshift.fr/?a=1&b=2".to_string(),
            lastmod: None,
            changefreq: "monthly",
            priority: "0.5",
        }]);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<loc>https://immoshift.fr/?a=1&amp;b=2</loc>"));
        assert!(xml.contains("<changefreq>monthly</changefreq><priority>0.5</priority>"));
        assert!(!xml.contains("<lastmod>"));
    }

    async fn setup_test_service() -> (SitemapService, Arc<Cache>, Arc<dyn ArticleRepository>, Arc<dyn TrainingRepository>) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let cache = create_cache(&CacheConfig::default());
        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let training_repo = SqlxTrainingRepository::boxed(pool.clone());
        let service = SitemapService::new(
            article_repo.clone(),
            training_repo.clone(),
            SqlxEbookRepository::boxed(pool),
            cache.clone(),
            "https://immoshift.fr/",
        );
        (service, cache, article_repo, training_repo)
    }

    fn article(title: &str, published: bool) -> ArticleInput {
        ArticleInput {
            title: title.to_string(),
            excerpt: "e".to_string(),
            is_published: published,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sections_only_list_public_content() {
        let (service, _, articles, trainings) = setup_test_service().await;
        articles.create("visible", &article("Visible", true)).await.unwrap();
        articles.create("brouillon", &article("Brouillon", false)).await.unwrap();
        trainings
            .create(
                "formation",
                &TrainingInput {
                    title: "Formation".to_string(),
                    slug: None,
                    short_description: "d".to_string(),
                    duration: None,
                    price: None,
                    show_price: true,
                    image: "trainings/t.jpg".to_string(),
                    video_url: None,
                    is_active: true,
                    position: 0,
                },
            )
            .await
            .unwrap();

        let urls = service.urls(SitemapSection::Articles).await.unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].loc, "https://immoshift.fr/articles/visible/");
        assert_eq!(urls[0].priority, "0.8");

        let trainings = service.urls(SitemapSection::Trainings).await.unwrap();
        assert_eq!(trainings[0].loc, "https://immoshift.fr/training/formation/");

        let xml = service.render_all().await.unwrap();
        let articles_at = xml.find("/articles/visible/").unwrap();
        let home_at = xml.find("<loc>https://immoshift.fr/</loc>").unwrap();
        assert!(articles_at < home_at);
    }

    #[tokio::test]
    async fn test_rendered_sitemap_is_cached_until_invalidated() {
        let (service, cache, articles, _) = setup_test_service().await;
        let before = service.render_section(SitemapSection::Articles).await.unwrap();

        articles.create("nouveau", &article("Nouveau", true)).await.unwrap();
        let cached = service.render_section(SitemapSection::Articles).await.unwrap();
        assert_eq!(before, cached);

        invalidate_public(&cache).await;
        let fresh = service.render_section(SitemapSection::Articles).await.unwrap();
        assert!(fresh.contains("/articles/nouveau/"));
    }
}
