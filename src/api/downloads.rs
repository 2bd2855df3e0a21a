//! Ebook download form
//!
//! POST /api/download-ebook records a lead and returns the download link.
//! Validation failures answer 400 with the bare `{"field": ["message"]}`
//! map rather than the error envelope.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::api::middleware::{ApiError, AppState, ClientIp};
use crate::services::lead::{build_download_url, FieldErrors, LeadError, LeadSubmission, SUCCESS_MESSAGE};

pub fn router() -> Router<AppState> {
    Router::new().route("/download-ebook", post(download_ebook))
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub ebook_id: i64,
    pub ebook_title: String,
}

fn field_errors(errors: FieldErrors) -> Response {
    (StatusCode::BAD_REQUEST, Json(errors)).into_response()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Parse the body, reporting shape problems as non-field errors
fn parse_submission(body: &[u8]) -> Result<LeadSubmission, FieldErrors> {
    let non_field = |message: String| {
        let mut errors = FieldErrors::new();
        errors.insert("non_field_errors".to_string(), vec![message]);
        errors
    };

    let value: Value = if body.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(body).map_err(|e| non_field(format!("JSON parse error - {}", e)))?
    };

    if !value.is_object() {
        return Err(non_field(format!(
            "Invalid data. Expected a dictionary, but got {}.",
            json_kind(&value)
        )));
    }
    serde_json::from_value(value).map_err(|e| non_field(e.to_string()))
}

/// Scheme the visitor used, honouring a TLS-terminating proxy
fn request_scheme(headers: &HeaderMap) -> &str {
    headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .and_then(|proto| proto.split(',').next())
        .map(str::trim)
        .unwrap_or("http")
}

/// POST /api/download-ebook
async fn download_ebook(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let submission = match parse_submission(&body) {
        Ok(submission) => submission,
        Err(errors) => return Ok(field_errors(errors)),
    };

    let (lead, ebook) = match state.leads.submit(&submission, ip).await {
        Ok(recorded) => recorded,
        Err(LeadError::Invalid(errors)) => return Ok(field_errors(errors)),
        Err(e) => return Err(e.into()),
    };

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    let download_url = build_download_url(host, request_scheme(&headers), &state.media.url(&ebook.file));

    let response = DownloadResponse {
        success: true,
        message: SUCCESS_MESSAGE.to_string(),
        download_url,
        ebook_id: lead.ebook_id,
        ebook_title: ebook.title,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}
