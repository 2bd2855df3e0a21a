//! Media upload endpoint
//!
//! POST /api/admin/media/{kind} stores the multipart field `file` under the
//! kind's directory and returns the media path to put on the entity.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::{ApiError, AppState};
use crate::services::MediaKind;

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Response for a stored file
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Media path, relative to the media directory
    pub path: String,
    pub url: String,
    /// Name the file was uploaded with
    pub filename: String,
    pub size: u64,
    pub content_type: String,
}

pub fn router(max_file_size: u64) -> Router<AppState> {
    let limit = usize::try_from(max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    Router::new()
        .route("/{kind}", post(upload))
        .layer(DefaultBodyLimit::max(limit))
}

/// POST /api/admin/media/{kind}
async fn upload(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let kind: MediaKind = kind.parse().map_err(ApiError::not_found)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("unknown").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        let path = state.media.save_bytes(kind, &filename, &data).await?;
        tracing::info!(path = %path, kind = %kind, size = data.len(), "Media uploaded");

        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: state.media.url(&path),
                path,
                filename,
                size: data.len() as u64,
                content_type,
            }),
        ));
    }

    Err(ApiError::validation_error("No file provided"))
}
