//! Public read endpoints
//!
//! Handles HTTP requests for the marketing site:
//! - GET /api/home - Home page aggregate
//! - GET /api/{testimonials,articles,trainings,ebooks,paragraphs}[/{id}]
//! - GET /api/{article,training,ebook}/{slug} - Detail by slug

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::catalog::{
    ArticleDetail, ArticleSummary, EbookDetail, EbookSummary, HomePage, PublicParagraph,
    PublicTestimonial, TrainingDetail, TrainingSummary,
};

/// Build the public content router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/testimonials", get(list_testimonials))
        .route("/testimonials/{id}", get(get_testimonial))
        .route("/articles", get(list_articles))
        .route("/articles/{id}", get(get_article))
        .route("/trainings", get(list_trainings))
        .route("/trainings/{id}", get(get_training))
        .route("/ebooks", get(list_ebooks))
        .route("/ebooks/{id}", get(get_ebook))
        .route("/paragraphs", get(list_paragraphs))
        .route("/paragraphs/{id}", get(get_paragraph))
        .route("/article/{slug}", get(article_by_slug))
        .route("/training/{slug}", get(training_by_slug))
        .route("/ebook/{slug}", get(ebook_by_slug))
}

/// GET /api/home
async fn home(State(state): State<AppState>) -> Result<Json<HomePage>, ApiError> {
    Ok(Json(state.catalog.home().await?))
}

async fn list_testimonials(State(state): State<AppState>) -> Result<Json<Vec<PublicTestimonial>>, ApiError> {
    Ok(Json(state.catalog.testimonials().await?))
}

async fn get_testimonial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicTestimonial>, ApiError> {
    Ok(Json(state.catalog.testimonial_by_id(id).await?))
}

/// GET /api/articles - Published articles, newest first
async fn list_articles(State(state): State<AppState>) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    Ok(Json(state.catalog.articles().await?))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ArticleDetail>, ApiError> {
    Ok(Json(state.catalog.article_by_id(id).await?))
}

async fn list_trainings(State(state): State<AppState>) -> Result<Json<Vec<TrainingSummary>>, ApiError> {
    Ok(Json(state.catalog.trainings().await?))
}

async fn get_training(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<TrainingDetail>, ApiError> {
    Ok(Json(state.catalog.training_by_id(id).await?))
}

async fn list_ebooks(State(state): State<AppState>) -> Result<Json<Vec<EbookSummary>>, ApiError> {
    Ok(Json(state.catalog.ebooks().await?))
}

async fn get_ebook(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<EbookDetail>, ApiError> {
    Ok(Json(state.catalog.ebook_by_id(id).await?))
}

async fn list_paragraphs(State(state): State<AppState>) -> Result<Json<Vec<PublicParagraph>>, ApiError> {
    Ok(Json(state.catalog.paragraphs().await?))
}

async fn get_paragraph(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PublicParagraph>, ApiError> {
    Ok(Json(state.catalog.paragraph_by_id(id).await?))
}

async fn article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ArticleDetail>, ApiError> {
    Ok(Json(state.catalog.article_by_slug(&slug).await?))
}

async fn training_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<TrainingDetail>, ApiError> {
    Ok(Json(state.catalog.training_by_slug(&slug).await?))
}

async fn ebook_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EbookDetail>, ApiError> {
    Ok(Json(state.catalog.ebook_by_slug(&slug).await?))
}
