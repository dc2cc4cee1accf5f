use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct UploadUrlRequest {
    filename: String,
    #[serde(rename = "contentType", alias = "content_type", default)]
    content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadUrlResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    key: String,
    #[serde(rename = "expiresAt")]
    expires_at: String,
}

/// Keep only the final path segment of a client-supplied filename so
/// the issued key cannot escape its upload prefix.
fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();
    if name.is_empty() {
        "upload".to_string()
    } else {
        name.to_string()
    }
}

async fn upload_url_handler(
    State(state): State<AppState>,
    Json(request): Json<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, StatusCode> {
    let filename = sanitize_filename(&request.filename);
    let key = format!("uploads/{}/{}", Uuid::new_v4(), filename);
    let expires_at = Utc::now() + Duration::seconds(state.upload.expiry_secs as i64);

    let upload_url = format!(
        "{}/{}/{}?expires={}",
        state.upload.base_url,
        state.upload.bucket,
        key,
        expires_at.timestamp(),
    );

    debug!(
        key = %key,
        content_type = request.content_type.as_deref().unwrap_or("unspecified"),
        "issued upload target"
    );

    Ok(Json(UploadUrlResponse {
        upload_url,
        key,
        expires_at: expires_at.to_rfc3339(),
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/documents/upload-url", post(upload_url_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("folder\\notes.docx"), "notes.docx");
        assert_eq!(sanitize_filename("  "), "upload");
    }
}
