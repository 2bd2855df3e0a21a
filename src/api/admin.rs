//! Admin content endpoints
//!
//! JSON CRUD behind session auth:
//! - /api/admin/{authors,testimonials,articles,trainings,paragraphs,ebooks}[/{id}]
//! - /api/admin/leads, /api/admin/leads/{id}, /api/admin/leads/export
//! - /api/admin/import/linkedin

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState};
use crate::models::{
    Article, ArticleFilter, ArticleInput, ArticleWithAuthor, Author, AuthorInput, Ebook, EbookFilter,
    EbookInput, EbookWithStats, LeadFilter, LeadWithEbook, Paragraph, ParagraphFilter, ParagraphInput,
    Testimonial, TestimonialFilter, TestimonialInput, Training, TrainingFilter, TrainingInput,
};
use crate::services::{ImportRequest, ImportSummary};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/{id}", get(get_author).put(update_author).delete(delete_author))
        .route("/testimonials", get(list_testimonials).post(create_testimonial))
        .route(
            "/testimonials/{id}",
            get(get_testimonial).put(update_testimonial).delete(delete_testimonial),
        )
        .route("/articles", get(list_articles).post(create_article))
        .route("/articles/{id}", get(get_article).put(update_article).delete(delete_article))
        .route("/trainings", get(list_trainings).post(create_training))
        .route("/trainings/{id}", get(get_training).put(update_training).delete(delete_training))
        .route("/paragraphs", get(list_paragraphs).post(create_paragraph))
        .route(
            "/paragraphs/{id}",
            get(get_paragraph).put(update_paragraph).delete(delete_paragraph),
        )
        .route("/ebooks", get(list_ebooks).post(create_ebook))
        .route("/ebooks/{id}", get(get_ebook).put(update_ebook).delete(delete_ebook))
        .route("/leads", get(list_leads))
        .route("/leads/export", get(export_leads))
        .route("/leads/{id}", delete(delete_lead))
        .route("/import/linkedin", post(import_linkedin))
}

/// `?search=` on the author list
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
}

// ============================================================================
// Authors
// ============================================================================

async fn list_authors(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Author>>, ApiError> {
    Ok(Json(state.authors.list(query.search.as_deref()).await?))
}

async fn create_author(
    State(state): State<AppState>,
    Json(input): Json<AuthorInput>,
) -> Result<impl IntoResponse, ApiError> {
    let author = state.authors.create(input).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn get_author(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.authors.get(id).await?))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AuthorInput>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.authors.update(id, input).await?))
}

async fn delete_author(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.authors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Testimonials
// ============================================================================

async fn list_testimonials(
    State(state): State<AppState>,
    Query(filter): Query<TestimonialFilter>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonials.list(&filter).await?))
}

async fn create_testimonial(
    State(state): State<AppState>,
    Json(input): Json<TestimonialInput>,
) -> Result<impl IntoResponse, ApiError> {
    let testimonial = state.testimonials.create(input).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

async fn get_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.testimonials.get(id).await?))
}

async fn update_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TestimonialInput>,
) -> Result<Json<Testimonial>, ApiError> {
    Ok(Json(state.testimonials.update(id, input).await?))
}

async fn delete_testimonial(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.testimonials.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Articles
// ============================================================================

async fn list_articles(
    State(state): State<AppState>,
    Query(filter): Query<ArticleFilter>,
) -> Result<Json<Vec<ArticleWithAuthor>>, ApiError> {
    Ok(Json(state.articles.list(&filter).await?))
}

async fn create_article(
    State(state): State<AppState>,
    Json(input): Json<ArticleInput>,
) -> Result<impl IntoResponse, ApiError> {
    let article = state.articles.create(input).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleWithAuthor>, ApiError> {
    Ok(Json(state.articles.get(id).await?))
}

async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.articles.update(id, input).await?))
}

async fn delete_article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.articles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Trainings
// ============================================================================

async fn list_trainings(
    State(state): State<AppState>,
    Query(filter): Query<TrainingFilter>,
) -> Result<Json<Vec<Training>>, ApiError> {
    Ok(Json(state.trainings.list(&filter).await?))
}

async fn create_training(
    State(state): State<AppState>,
    Json(input): Json<TrainingInput>,
) -> Result<impl IntoResponse, ApiError> {
    let training = state.trainings.create(input).await?;
    Ok((StatusCode::CREATED, Json(training)))
}

async fn get_training(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Training>, ApiError> {
    Ok(Json(state.trainings.get(id).await?))
}

async fn update_training(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<TrainingInput>,
) -> Result<Json<Training>, ApiError> {
    Ok(Json(state.trainings.update(id, input).await?))
}

async fn delete_training(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.trainings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Paragraphs
// ============================================================================

async fn list_paragraphs(
    State(state): State<AppState>,
    Query(filter): Query<ParagraphFilter>,
) -> Result<Json<Vec<Paragraph>>, ApiError> {
    Ok(Json(state.paragraphs.list(&filter).await?))
}

async fn create_paragraph(
    State(state): State<AppState>,
    Json(input): Json<ParagraphInput>,
) -> Result<impl IntoResponse, ApiError> {
    let paragraph = state.paragraphs.create(input).await?;
    Ok((StatusCode::CREATED, Json(paragraph)))
}

async fn get_paragraph(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Paragraph>, ApiError> {
    Ok(Json(state.paragraphs.get(id).await?))
}

async fn update_paragraph(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ParagraphInput>,
) -> Result<Json<Paragraph>, ApiError> {
    Ok(Json(state.paragraphs.update(id, input).await?))
}

async fn delete_paragraph(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.paragraphs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Ebooks
// ============================================================================

/// Ebooks with their download count
async fn list_ebooks(
    State(state): State<AppState>,
    Query(filter): Query<EbookFilter>,
) -> Result<Json<Vec<EbookWithStats>>, ApiError> {
    Ok(Json(state.ebooks.list(&filter).await?))
}

async fn create_ebook(
    State(state): State<AppState>,
    Json(input): Json<EbookInput>,
) -> Result<impl IntoResponse, ApiError> {
    let ebook = state.ebooks.create(input).await?;
    Ok((StatusCode::CREATED, Json(ebook)))
}

async fn get_ebook(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Ebook>, ApiError> {
    Ok(Json(state.ebooks.get(id).await?))
}

async fn update_ebook(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<EbookInput>,
) -> Result<Json<Ebook>, ApiError> {
    Ok(Json(state.ebooks.update(id, input).await?))
}

async fn delete_ebook(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.ebooks.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Leads
// ============================================================================

/// Lead selection; `ids` is a comma separated list
#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub ebook_id: Option<i64>,
    #[serde(default)]
    pub consent_mailing: Option<bool>,
    #[serde(default)]
    pub ids: Option<String>,
    /// Export only: keep leads who accepted the mailing list
    #[serde(default)]
    pub consented: bool,
}

impl LeadQuery {
    fn filter(&self) -> Result<LeadFilter, ApiError> {
        let ids = match self.ids.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.split(',')
                    .map(|id| id.trim().parse::<i64>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| ApiError::validation_error("ids must be a comma separated list of integers"))?,
            ),
            None => None,
        };

        Ok(LeadFilter {
            search: self.search.clone(),
            ebook_id: self.ebook_id,
            consent_mailing: self.consent_mailing,
            ids,
        })
    }
}

async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<Vec<LeadWithEbook>>, ApiError> {
    Ok(Json(state.leads.list(&query.filter()?).await?))
}

async fn delete_lead(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    state.leads.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/admin/leads/export - CSV attachment
async fn export_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let export = state.leads.export_csv(&query.filter()?, query.consented).await?;

    let disposition = format!("attachment; filename=\"{}\"", export.filename);
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|_| ApiError::internal_error("Invalid export filename"))?,
    );
    Ok((headers, export.content))
}

// ============================================================================
// LinkedIn import
// ============================================================================

/// POST /api/admin/import/linkedin
async fn import_linkedin(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary: ImportSummary = state.importer.import(&request).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}
