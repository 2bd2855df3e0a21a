//! Sitemap endpoints
//!
//! - GET /api/sitemap.xml - All sections in one urlset
//! - GET /api/sitemaps/{section} - One section, `.xml` suffix optional

use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::api::middleware::{ApiError, AppState};
use crate::services::SitemapSection;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sitemap.xml", get(sitemap_index))
        .route("/sitemaps/{section}", get(sitemap_section))
}

fn xml(body: String) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], body)
}

async fn sitemap_index(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let body = state.sitemap.render_all().await.map_err(|e| {
        tracing::error!(error = ?e, "Failed to render sitemap");
        ApiError::internal_error("Failed to render sitemap")
    })?;
    Ok(xml(body))
}

async fn sitemap_section(
    State(state): State<AppState>,
    Path(section): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let section: SitemapSection = section.parse().map_err(ApiError::not_found)?;

    let body = state.sitemap.render_section(section).await.map_err(|e| {
        tracing::error!(error = ?e, section = section.as_str(), "Failed to render sitemap section");
        ApiError::internal_error("Failed to render sitemap")
    })?;
    Ok(xml(body))
}
