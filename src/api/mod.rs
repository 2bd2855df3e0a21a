//! API layer - HTTP handlers and routing
//!
//! - Public content reads, lead capture and sitemaps under `/api`
//! - Admin auth, CRUD, lead export, LinkedIn import and uploads under
//!   `/api/admin`
//! - Media files served under the configured URL prefix

pub mod admin;
pub mod auth;
pub mod downloads;
pub mod middleware;
pub mod public;
pub mod sitemap;
pub mod upload;

#[cfg(test)]
mod tests;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower::Layer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub use middleware::{ApiError, AppState, AuthenticatedUser, ClientIp};

/// Build the `/api` router
pub fn build_api_router(state: AppState, max_file_size: u64) -> Router<AppState> {
    let admin_routes = Router::new()
        .nest("/admin", admin::router())
        .nest("/admin/auth", auth::protected_router())
        .nest("/admin/media", upload::router(max_file_size))
        .route_layer(axum_middleware::from_fn_with_state(state, middleware::require_auth));

    Router::new()
        .merge(public::router())
        .merge(downloads::router())
        .merge(sitemap::router())
        .nest("/admin/auth", auth::public_router())
        .merge(admin_routes)
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE]);

    match origin.parse::<HeaderValue>() {
        Ok(_) if origin == "*" => cors.allow_origin(AllowOrigin::any()),
        Ok(value) => cors.allow_origin(value).allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
            cors
        }
    }
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, config: &Config) -> Router {
    let mut router = Router::new().nest("/api", build_api_router(state.clone(), config.media.max_file_size));

    let media_prefix = config.media.url_prefix.trim_end_matches('/');
    if media_prefix.starts_with('/') && media_prefix.len() > 1 {
        router = router.nest_service(media_prefix, ServeDir::new(&config.media.path));
    }

    router
        .layer(cors_layer(&config.server.cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router wrapped so that `/api/articles/` and `/api/articles` match alike
pub fn build_app(state: AppState, config: &Config) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(build_router(state, config))
}
