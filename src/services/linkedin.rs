//! LinkedIn post scraper
//!
//! Turns a public LinkedIn post page into the fields of an article. The
//! markup is undocumented and changes without notice, so every selector
//! lives in [`selectors`] and every extraction step has a fallback. Only a
//! missing post text or a failed fetch is an error.

use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::ACCEPT_LANGUAGE;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// CSS selectors for the public post page
pub mod selectors {
    pub const POST_TEXT: &str = ".attributed-text-segment-list__content";
    pub const JSON_LD: &str = r#"script[type="application/ld+json"]"#;
    pub const POST_IMAGE: &str = ".feed-images-content img";
    pub const OG_IMAGE: &str = r#"meta[property="og:image"]"#;
    pub const TIME: &str = "time";
    pub const RELATIVE_TIME: &str = ".comment__duration-since, span.text-color-text-low-emphasis time";
    pub const AUTHOR_NAME: &str = ".base-main-feed-card__entity-lockup a.link-styled";
    pub const AUTHOR_HEADLINE: &str = ".base-main-feed-card__entity-lockup p.text-color-text-low-emphasis";
    pub const AUTHOR_IMAGE: &str = ".base-main-feed-card__entity-lockup img";
}

pub const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";
pub const DEFAULT_TITLE: &str = "LinkedIn Post";
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

const TITLE_MAX: usize = 200;
const EXCERPT_MAX: usize = 500;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid CSS selector")
}

static POST_TEXT: Lazy<Selector> = Lazy::new(|| selector(selectors::POST_TEXT));
static JSON_LD: Lazy<Selector> = Lazy::new(|| selector(selectors::JSON_LD));
static POST_IMAGE: Lazy<Selector> = Lazy::new(|| selector(selectors::POST_IMAGE));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(selectors::OG_IMAGE));
static TIME: Lazy<Selector> = Lazy::new(|| selector(selectors::TIME));
static RELATIVE_TIME: Lazy<Selector> = Lazy::new(|| selector(selectors::RELATIVE_TIME));
static AUTHOR_NAME: Lazy<Selector> = Lazy::new(|| selector(selectors::AUTHOR_NAME));
static AUTHOR_HEADLINE: Lazy<Selector> = Lazy::new(|| selector(selectors::AUTHOR_HEADLINE));
static AUTHOR_IMAGE: Lazy<Selector> = Lazy::new(|| selector(selectors::AUTHOR_IMAGE));

/// "3d", "3 days ago", "3 j", "3 jours"
static DAYS_AGO: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s*(?:d|days?|j|jours?)(?:\s+ago)?$").expect("valid days-ago regex")
});

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Failed to fetch LinkedIn post: {message}")]
    Fetch { source_url: String, message: String },

    #[error("Could not extract content from the LinkedIn post.")]
    NoContent { source_url: String },
}

impl ScrapeError {
    /// Cleaned URL of the post that failed
    pub fn source_url(&self) -> &str {
        match self {
            ScrapeError::Fetch { source_url, .. } | ScrapeError::NoContent { source_url } => source_url,
        }
    }
}

/// Article fields extracted from a post
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedPost {
    /// First line of the post
    pub title: String,
    /// Second line of the post, or the title
    pub excerpt: String,
    /// Full post text
    pub content: String,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    /// Post URL without query string
    pub source_url: String,
    pub author_name: String,
    pub author_headline: String,
    pub author_image_url: Option<String>,
}

/// Public post URL on linkedin.com or one of its subdomains
pub fn is_linkedin_post_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host_ok = host == "linkedin.com" || host == "www.linkedin.com" || host.ends_with(".linkedin.com");
    host_ok && parsed.path().contains("/posts/")
}

/// Drop tracking parameters: everything from the first `?`
pub fn clean_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => base.to_string(),
        None => url.to_string(),
    }
}

/// Keep `max` characters, or `max - 3` followed by `...` when longer
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// Extract a post from its HTML. `now` anchors relative and missing dates.
pub fn parse_post_html(html: &str, source_url: &str, now: DateTime<Utc>) -> Result<ScrapedPost, ScrapeError> {
    let document = Html::parse_document(html);
    let json_ld = json_ld_objects(&document);

    let content = document
        .select(&POST_TEXT)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join("\n").trim().to_string())
        .filter(|text| !text.is_empty())
        .or_else(|| {
            json_ld
                .iter()
                .find_map(|data| data.get("articleBody").and_then(|v| v.as_str()))
                .map(str::to_string)
                .filter(|text| !text.trim().is_empty())
        })
        .ok_or_else(|| ScrapeError::NoContent {
            source_url: source_url.to_string(),
        })?;

    let lines: Vec<&str> = content.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let title = lines.first().copied().unwrap_or(DEFAULT_TITLE);
    let excerpt = lines.get(1).copied().unwrap_or(title);

    let image_url = document
        .select(&POST_IMAGE)
        .next()
        .and_then(delayed_or_src)
        .or_else(|| attr(&document, &OG_IMAGE, "content"));

    let published_at = published_date(&document, &json_ld, now);

    let author_name = first_text(&document, &AUTHOR_NAME).unwrap_or_else(|| DEFAULT_AUTHOR.to_string());
    let author_headline = first_text(&document, &AUTHOR_HEADLINE).unwrap_or_default();
    let author_image_url = document.select(&AUTHOR_IMAGE).next().and_then(delayed_or_src);

    Ok(ScrapedPost {
        title: truncate_with_ellipsis(title, TITLE_MAX),
        excerpt: truncate_with_ellipsis(excerpt, EXCERPT_MAX),
        content,
        image_url,
        published_at,
        source_url: source_url.to_string(),
        author_name,
        author_headline,
        author_image_url,
    })
}

/// Parse the date forms found in post markup: RFC 3339 (with `Z` or an
/// offset), naive date-times taken as UTC, and plain dates.
pub fn parse_iso_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Midnight UTC `N` days before `now` for an "N days ago" label
pub fn parse_relative_days(text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let captures = DAYS_AGO.captures(text.trim())?;
    let days: i64 = captures[1].parse().ok()?;
    let day = now.date_naive().checked_sub_signed(Duration::try_days(days)?)?;
    day.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive))
}

fn published_date(document: &Html, json_ld: &[serde_json::Value], now: DateTime<Utc>) -> DateTime<Utc> {
    json_ld
        .iter()
        .find_map(|data| data.get("datePublished").and_then(|v| v.as_str()))
        .and_then(parse_iso_datetime)
        .or_else(|| {
            document
                .select(&TIME)
                .filter_map(|el| el.value().attr("datetime"))
                .find_map(parse_iso_datetime)
        })
        .or_else(|| {
            document
                .select(&RELATIVE_TIME)
                .next()
                .and_then(|el| parse_relative_days(&el.text().collect::<String>(), now))
        })
        .unwrap_or(now)
}

fn json_ld_objects(document: &Html) -> Vec<serde_json::Value> {
    document
        .select(&JSON_LD)
        .filter_map(|script| serde_json::from_str::<serde_json::Value>(&script.inner_html()).ok())
        .filter(|value| value.is_object())
        .collect()
}

fn delayed_or_src(img: ElementRef<'_>) -> Option<String> {
    img.value()
        .attr("data-delayed-url")
        .or_else(|| img.value().attr("src"))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn attr(document: &Html, selector: &Selector, name: &str) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(name))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// Fetches posts over HTTP with a browser-like client
#[derive(Clone)]
pub struct LinkedInScraper {
    client: reqwest::Client,
}

impl LinkedInScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Shared client, also used to download the post images
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub async fn scrape(&self, url: &str) -> Result<ScrapedPost, ScrapeError> {
        let source_url = clean_url(url);
        tracing::info!(url = %source_url, "Scraping LinkedIn post");

        let html = self.fetch(&source_url).await.map_err(|e| {
            tracing::warn!(url = %source_url, error = %e, "Failed to fetch LinkedIn post");
            ScrapeError::Fetch {
                source_url: source_url.clone(),
                message: e.to_string(),
            }
        })?;

        parse_post_html(&html, &source_url, Utc::now())
    }

    async fn fetch(&self, url: &str) -> reqwest::Result<String> {
        self.client
            .get(url)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const POST_PAGE: &str = r#"<!DOCTYPE html>
<html><head>
<meta property="og:image" content="https://media.licdn.com/og.jpg">
<script type="application/ld+json">{"@type": "SocialMediaPosting", "datePublished": "2024-05-02T08:15:00.000Z"}</script>
</head><body>
<div class="base-main-feed-card__entity-lockup">
  <img data-delayed-url="https://media.licdn.com/author.jpg" src="placeholder.gif">
  <a class="link-styled" href="/in/julie"> Julie Martin </a>
  <p class="text-color-text-low-emphasis"> Conseillère en investissement locatif </p>
</div>
<p class="attributed-text-segment-list__content">Investir en 2024
<br>
Les taux baissent enfin.
<br>Voici ce que cela change.</p>
<ul class="feed-images-content"><li><img data-delayed-url="https://media.licdn.com/post.jpg"></li></ul>
</body></html>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 15, 45, 0).unwrap()
    }

    #[test]
    fn test_is_linkedin_post_url() {
        assert!(is_linkedin_post_url("https://www.linkedin.com/posts/julie_investir-activity-1"));
        assert!(is_linkedin_post_url("https://linkedin.com/posts/abc"));
        assert!(is_linkedin_post_url("https://fr.linkedin.com/posts/abc?trk=x"));
        assert!(!is_linkedin_post_url("https://www.linkedin.com/in/julie"));
        assert!(!is_linkedin_post_url("https://example.com/posts/abc"));
        assert!(!is_linkedin_post_url("https://notlinkedin.com/posts/abc"));
        assert!(!is_linkedin_post_url("pas une url"));
    }

    #[test]
    fn test_clean_url() {
        assert_eq!(
            clean_url("https://www.linkedin.com/posts/abc?utm_source=share&trk=x"),
            "https://www.linkedin.com/posts/abc"
        );
        assert_eq!(clean_url("https://www.linkedin.com/posts/abc"), "https://www.linkedin.com/posts/abc");
    }

    #[test]
    fn test_parse_full_post() {
        let post = parse_post_html(POST_PAGE, "https://www.linkedin.com/posts/abc", now()).unwrap();

        assert_eq!(post.title, "Investir en 2024");
        assert_eq!(post.excerpt, "Les taux baissent enfin.");
        assert!(post.content.contains("Voici ce que cela change."));
        assert_eq!(post.image_url.as_deref(), Some("https://media.licdn.com/post.jpg"));
        assert_eq!(post.published_at, Utc.with_ymd_and_hms(2024, 5, 2, 8, 15, 0).unwrap());
        assert_eq!(post.author_name, "Julie Martin");
        assert_eq!(post.author_headline, "Conseillère en investissement locatif");
        assert_eq!(post.author_image_url.as_deref(), Some("https://media.licdn.com/author.jpg"));
        assert_eq!(post.source_url, "https://www.linkedin.com/posts/abc");
    }

    #[test]
    fn test_json_ld_fallbacks() {
        let html = r#"<html><head>
<meta property="og:image" content="https://media.licdn.com/og.jpg">
<script type="application/ld+json">not json</script>
<script type="application/ld+json">{"articleBody": "Une seule ligne"}</script>
</head><body><time datetime="2024-01-15">15 janv.</time></body></html>"#;

        let post = parse_post_html(html, "u", now()).unwrap();
        assert_eq!(post.title, "Une seule ligne");
        assert_eq!(post.excerpt, "Une seule ligne");
        assert_eq!(post.image_url.as_deref(), Some("https://media.licdn.com/og.jpg"));
        assert_eq!(post.published_at, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(post.author_name, DEFAULT_AUTHOR);
        assert_eq!(post.author_headline, "");
        assert!(post.author_image_url.is_none());
    }

    #[test]
    fn test_no_content() {
        let err = parse_post_html("<html><body><p>Connexion</p></body></html>", "u", now()).unwrap_err();
        assert!(matches!(err, ScrapeError::NoContent { .. }));
        assert_eq!(err.source_url(), "u");
    }

    #[test]
    fn test_relative_and_missing_dates() {
        let html = r#"<p class="attributed-text-segment-list__content">Titre</p>
<span class="comment__duration-since">3d</span>"#;
        let post = parse_post_html(html, "u", now()).unwrap();
        assert_eq!(post.published_at, Utc.with_ymd_and_hms(2024, 6, 7, 0, 0, 0).unwrap());

        let html = r#"<p class="attributed-text-segment-list__content">Titre</p>"#;
        assert_eq!(parse_post_html(html, "u", now()).unwrap().published_at, now());
    }

    #[test]
    fn test_parse_relative_days() {
        assert!(parse_relative_days("2 days ago", now()).is_some());
        assert_eq!(
            parse_relative_days("5 jours", now()),
            Some(Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap())
        );
        assert!(parse_relative_days("1 j", now()).is_some());
        assert!(parse_relative_days("3h", now()).is_none());
        assert!(parse_relative_days("1w", now()).is_none());
        assert!(parse_relative_days("99999999d", now()).is_none());
    }

    #[test]
    fn test_out_of_range_relative_date_falls_back_to_now() {
        let html = r#"<p class="attributed-text-segment-list__content">Titre</p>
<span class="comment__duration-since">99999999d</span>"#;
        let post = parse_post_html(html, "u", now()).unwrap();
        assert_eq!(post.published_at, now());
    }

    #[test]
    fn test_first_parsable_time_wins() {
        let html = r#"<p class="attributed-text-segment-list__content">Titre</p>
<time datetime="il y a peu">récemment</time>
<time datetime="2024-02-20T09:30:00Z">20 févr.</time>
<time datetime="2023-01-01">1 janv.</time>"#;
        let post = parse_post_html(html, "u", now()).unwrap();
        assert_eq!(post.published_at, Utc.with_ymd_and_hms(2024, 2, 20, 9, 30, 0).unwrap());
    }

    #[test]
    fn test_empty_post_text_uses_article_body() {
        let html = r#"<html><head>
<script type="application/ld+json">{"articleBody": "Titre du post\nDeuxième ligne"}</script>
</head><body><p class="attributed-text-segment-list__content">  </p></body></html>"#;
        let post = parse_post_html(html, "u", now()).unwrap();
        assert_eq!(post.title, "Titre du post");
        assert_eq!(post.excerpt, "Deuxième ligne");
    }

    #[test]
    fn test_parse_iso_datetime() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_iso_datetime("2024-03-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_iso_datetime("2024-03-01T12:00:00+02:00"), Some(expected));
        assert_eq!(parse_iso_datetime("2024-03-01T10:00:00"), Some(expected));
        assert!(parse_iso_datetime("hier").is_none());
    }

    #[test]
    fn test_long_title_truncated() {
        let title = "a".repeat(250);
        let html = format!(r#"<p class="attributed-text-segment-list__content">{}</p>"#, title);
        let post = parse_post_html(&html, "u", now()).unwrap();

        assert_eq!(post.title.chars().count(), 200);
        assert_eq!(post.title, format!("{}...", "a".repeat(197)));
        assert_eq!(post.excerpt, "a".repeat(250));
    }

    #[test]
    fn test_truncate_counts_characters() {
        let text = "é".repeat(201);
        let truncated = truncate_with_ellipsis(&text, 200);
        assert_eq!(truncated, format!("{}...", "é".repeat(197)));
        assert_eq!(truncate_with_ellipsis("court", 200), "court");
    }

    proptest! {
        #[test]
        fn prop_truncation_fits(text in "\\PC{0,600}", max in 3usize..600) {
            let out = truncate_with_ellipsis(&text, max);
            prop_assert!(out.chars().count() <= max);
            if text.chars().count() <= max {
                prop_assert_eq!(out, text);
            } else {
                prop_assert!(out.ends_with("..."));
            }
        }

        #[test]
        fn prop_clean_url_has_no_query(base in "https://www\\.linkedin\\.com/posts/[a-z0-9_-]{1,20}", query in "[a-z=&]{0,20}") {
            let cleaned = clean_url(&format!("{}?{}", base, query));
            prop_assert_eq!(cleaned, base);
        }
    }

    #[tokio::test]
    async fn test_scrape_strips_query_and_sends_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/posts/julie_investir"))
            .and(|req: &Request| {
                req.headers.get("accept-language").and_then(|v| v.to_str().ok()) == Some(ACCEPT_LANGUAGE_VALUE)
            })
            .respond_with(ResponseTemplate::new(200).set_body_string(POST_PAGE))
            .mount(&server)
            .await;

        let scraper = LinkedInScraper::new(&ScraperConfig::default()).unwrap();
        let url = format!("{}/posts/julie_investir?trk=public_post", server.uri());
        let post = scraper.scrape(&url).await.unwrap();

        assert_eq!(post.title, "Investir en 2024");
        assert_eq!(post.source_url, format!("{}/posts/julie_investir", server.uri()));
    }

    #[tokio::test]
    async fn test_scrape_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let scraper = LinkedInScraper::new(&ScraperConfig::default()).unwrap();
        let url = format!("{}/posts/abc", server.uri());
        let err = scraper.scrape(&url).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Fetch { .. }));
        assert_eq!(err.source_url(), url);
    }
}
