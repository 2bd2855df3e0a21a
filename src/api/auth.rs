//! Admin authentication endpoints
//!
//! - POST /api/admin/auth/login - Open a session
//! - POST /api/admin/auth/logout - Close it (requires auth)
//! - GET /api/admin/auth/me - Current admin (requires auth)

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::middleware::{extract_session_token, ApiError, AppState, AuthenticatedUser};
use crate::models::User;
use crate::services::LoginInput;

/// Session cookie lifetime, matches the session expiration
const SESSION_COOKIE_MAX_AGE: i64 = 7 * 24 * 60 * 60;

const CLEAR_SESSION_COOKIE: &str = "session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";

pub fn public_router() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(get_current_user))
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// POST /api/admin/auth/login
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let login = body.login.clone();
    let (session, user) = state.user_service.login(body).await.map_err(|e| {
        tracing::warn!(login = %login, "Admin login failed");
        ApiError::from(e)
    })?;

    let cookie = format!(
        "session={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        session.id, SESSION_COOKIE_MAX_AGE
    );
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).map_err(|_| ApiError::internal_error("Invalid session cookie"))?,
    );

    tracing::info!(user_id = user.id, "Admin logged in");
    Ok((
        headers,
        Json(AuthResponse {
            user: user.into(),
            token: session.id,
            expires_at: session.expires_at,
        }),
    ))
}

/// POST /api/admin/auth/logout
async fn logout(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = extract_session_token(&headers)
        .ok_or_else(|| ApiError::unauthorized("Missing authentication token"))?;

    state.user_service.logout(&token).await?;

    let mut response_headers = HeaderMap::new();
    response_headers.insert(header::SET_COOKIE, HeaderValue::from_static(CLEAR_SESSION_COOKIE));
    Ok((StatusCode::NO_CONTENT, response_headers))
}

/// GET /api/admin/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<UserResponse> {
    Json(user.0.into())
}
