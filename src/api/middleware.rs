//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error envelope and its mapping from service errors
//! - Session authentication for the admin routes
//! - Client IP extraction for lead capture

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxArticleRepository, SqlxAuthorRepository, SqlxEbookDownloadRepository, SqlxEbookRepository,
    SqlxParagraphRepository, SqlxSessionRepository, SqlxTestimonialRepository, SqlxTrainingRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    create_mailer, ArticleService, AuthorService, CatalogService, ContentError, EbookService,
    EmailNotifier, ImportError, LeadError, LeadService, LinkedInImporter, LinkedInScraper,
    MediaError, MediaStorage, ParagraphError, ParagraphService, SitemapService, TestimonialService,
    TrainingService, UserService, UserServiceError,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub catalog: Arc<CatalogService>,
    pub authors: Arc<AuthorService>,
    pub testimonials: Arc<TestimonialService>,
    pub articles: Arc<ArticleService>,
    pub trainings: Arc<TrainingService>,
    pub paragraphs: Arc<ParagraphService>,
    pub ebooks: Arc<EbookService>,
    pub leads: Arc<LeadService>,
    pub sitemap: Arc<SitemapService>,
    pub importer: Arc<LinkedInImporter>,
    pub media: Arc<MediaStorage>,
}

impl AppState {
    /// Wire repositories and services over one pool
    pub fn new(config: &Config, pool: DynDatabasePool) -> anyhow::Result<Self> {
        let cache = create_cache(&config.cache);
        let media = Arc::new(MediaStorage::new(&config.media));

        let article_repo = SqlxArticleRepository::boxed(pool.clone());
        let author_repo = SqlxAuthorRepository::boxed(pool.clone());
        let ebook_repo = SqlxEbookRepository::boxed(pool.clone());
        let lead_repo = SqlxEbookDownloadRepository::boxed(pool.clone());
        let paragraph_repo = SqlxParagraphRepository::boxed(pool.clone());
        let testimonial_repo = SqlxTestimonialRepository::boxed(pool.clone());
        let training_repo = SqlxTrainingRepository::boxed(pool.clone());

        let notifier = Arc::new(EmailNotifier::new(
            create_mailer(&config.email)?,
            config.email.admin_email.clone(),
            config.site.name.clone(),
        ));
        let scraper = LinkedInScraper::new(&config.scraper)?;

        Ok(Self {
            user_service: Arc::new(UserService::new(
                SqlxUserRepository::boxed(pool.clone()),
                SqlxSessionRepository::boxed(pool.clone()),
            )),
            catalog: Arc::new(CatalogService::new(
                article_repo.clone(),
                training_repo.clone(),
                ebook_repo.clone(),
                testimonial_repo.clone(),
                paragraph_repo.clone(),
                media.clone(),
                cache.clone(),
            )),
            authors: Arc::new(AuthorService::new(author_repo.clone(), cache.clone())),
            testimonials: Arc::new(TestimonialService::new(testimonial_repo, cache.clone())),
            articles: Arc::new(ArticleService::new(article_repo.clone(), author_repo, cache.clone())),
            trainings: Arc::new(TrainingService::new(training_repo.clone(), cache.clone())),
            paragraphs: Arc::new(ParagraphService::new(
                paragraph_repo,
                article_repo.clone(),
                training_repo.clone(),
                media.clone(),
            )),
            ebooks: Arc::new(EbookService::new(ebook_repo.clone(), cache.clone())),
            leads: Arc::new(LeadService::new(ebook_repo.clone(), lead_repo, notifier)),
            sitemap: Arc::new(SitemapService::new(
                article_repo,
                training_repo,
                ebook_repo,
                cache.clone(),
                &config.site.base_url,
            )),
            importer: Arc::new(LinkedInImporter::new(pool.clone(), scraper, media.clone(), cache)),
            media,
            pool,
        })
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new("BAD_GATEWAY", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "BAD_GATEWAY" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Internal failures are logged with their chain and hidden from clients
fn internal(e: anyhow::Error) -> ApiError {
    tracing::error!(error = ?e, "Request failed");
    ApiError::internal_error("Internal server error")
}

impl From<ContentError> for ApiError {
    fn from(e: ContentError) -> Self {
        match e {
            ContentError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ContentError::ValidationError(msg) => ApiError::validation_error(msg),
            ContentError::DuplicateSlug(slug) => {
                ApiError::with_details("CONFLICT", "Slug already in use", serde_json::json!({ "slug": slug }))
            }
            ContentError::InternalError(e) => internal(e),
        }
    }
}

impl From<ParagraphError> for ApiError {
    fn from(e: ParagraphError) -> Self {
        match e {
            ParagraphError::Validation(msg) => ApiError::validation_error(msg),
            ParagraphError::NotFound(what) => ApiError::not_found(format!("{} not found", what)),
            ParagraphError::Internal(e) => internal(e),
        }
    }
}

impl From<LeadError> for ApiError {
    fn from(e: LeadError) -> Self {
        match e {
            LeadError::Invalid(errors) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Invalid lead submission",
                serde_json::to_value(errors).unwrap_or_default(),
            ),
            LeadError::NotFound(id) => ApiError::not_found(format!("Lead {} not found", id)),
            LeadError::Internal(e) => internal(e),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        let message = e.to_string();
        match e {
            ImportError::Validation(msg) => ApiError::with_details(
                "VALIDATION_ERROR",
                msg.clone(),
                serde_json::json!({ "linkedin_url": [msg] }),
            ),
            ImportError::DuplicateSlug(_) => ApiError::conflict(message),
            ImportError::Scrape(scrape) => ApiError::with_details(
                "BAD_GATEWAY",
                scrape.to_string(),
                serde_json::json!({ "source_url": scrape.source_url() }),
            ),
            ImportError::Internal(e) => internal(e),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        let message = e.to_string();
        match e {
            MediaError::TooLarge { .. } | MediaError::InvalidPath(_) => ApiError::validation_error(message),
            MediaError::Io(e) => internal(e.into()),
        }
    }
}

impl From<UserServiceError> for ApiError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::AuthenticationError(_) => ApiError::unauthorized("Invalid username or password"),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => internal(e),
        }
    }
}

/// Extract session token from request headers
pub(crate) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = headers.get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(token) = cookie.strip_prefix("session=") {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    let user = state
        .user_service
        .validate_session(&token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Caller address: first `X-Forwarded-For` entry, `X-Real-IP`, then the
/// socket peer
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIp(pub Option<String>);

pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = forwarded.split(',').next().map(str::trim).filter(|ip| !ip.is_empty()) {
            return Some(ip.to_string());
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|h| h.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    peer.map(|addr| addr.ip().to_string())
}

impl<S: Send + Sync> FromRequestParts<S> for ClientIp {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp(client_ip(&parts.headers, peer)))
    }
}
