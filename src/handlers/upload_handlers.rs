//! Generic upload endpoints used by the client orchestrator.
//!
//! - `POST /api/upload/presigned` hands out a PUT URL for a direct upload.
//! - `POST /api/upload/proxy` accepts the bytes and writes them itself; it is
//!   the fallback when the direct PUT fails.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok},
    services::{
        file_keys::generate_file_key,
        file_validation::{guess_content_type, normalize_content_type, validate_file},
        object_store::DEFAULT_PRESIGN_EXPIRY,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, State},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

pub const DEFAULT_UPLOAD_CATEGORY: &str = "uploads";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub presigned_url: String,
    pub public_url: String,
    pub key: String,
    /// The `Content-Type` the URL was signed for; the PUT must send it verbatim.
    pub content_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyUploadResponse {
    pub key: String,
    pub public_url: String,
    pub size: u64,
}

/// A file part pulled out of a multipart body.
pub struct FilePart {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Text fields plus the (single) `file` part of a multipart form.
#[derive(Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            if name == "file" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .filter(|ct| ct != "application/octet-stream")
                    .unwrap_or_else(|| guess_content_type(&file_name).to_string());
                let bytes = field.bytes().await?;
                form.file = Some(FilePart {
                    file_name,
                    content_type,
                    bytes,
                });
            } else {
                form.fields.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn take_file(&mut self) -> Result<FilePart, AppError> {
        self.file
            .take()
            .ok_or_else(|| AppError::bad_request("multipart field `file` is required"))
    }
}

/// `POST /api/upload/presigned`
///
/// Validation runs first, so an oversized or disallowed file never costs a
/// signing call.
pub async fn presign_upload(
    State(state): State<AppState>,
    Json(req): Json<PresignRequest>,
) -> Result<Json<ApiResponse<PresignResponse>>, AppError> {
    validate_file(&req.file_name, &req.content_type, req.file_size)?;

    let category = req.category.as_deref().unwrap_or(DEFAULT_UPLOAD_CATEGORY);
    let key = generate_file_key(category, &req.file_name);
    let content_type = normalize_content_type(&req.content_type);
    let presigned_url = state
        .store
        .presigned_upload_url(&key, &content_type, DEFAULT_PRESIGN_EXPIRY)
        .await?;

    info!(key = %key, size = req.file_size, content_type = %content_type, "presigned upload issued");
    Ok(ok(PresignResponse {
        public_url: state.store.public_url(&key),
        presigned_url,
        key,
        content_type,
    }))
}

/// `POST /api/upload/proxy`
pub async fn proxy_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<ProxyUploadResponse>>, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file()?;
    validate_file(&file.file_name, &file.content_type, file.bytes.len() as u64)?;

    let category = form.text("category").unwrap_or(DEFAULT_UPLOAD_CATEGORY);
    let key = generate_file_key(category, &file.file_name);
    let stored = state
        .store
        .put_object(&key, &normalize_content_type(&file.content_type), file.bytes)
        .await?;

    info!(key = %stored.key, size = stored.size_bytes, "proxy upload stored");
    Ok(ok(ProxyUploadResponse {
        public_url: state.store.public_url(&stored.key),
        key: stored.key,
        size: stored.size_bytes,
    }))
}
