//! PDF/resource library endpoints.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok, upload_handlers::MultipartForm},
    models::resource::{RecordResource, ResourceFilter, ResourceView, UpdateResourceFlags},
    services::resource_service::UploadFields,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct DeleteQuery {
    /// Also remove the stored object.
    #[serde(default)]
    pub purge: bool,
}

/// Body of the legacy upload response: `{ success, pdf }`.
#[derive(Debug, Serialize)]
pub struct LegacyUploadResponse {
    pub success: bool,
    pub pdf: ResourceView,
}

/// `GET /api/admin/pdfs`
pub async fn list_resources(
    State(state): State<AppState>,
    Query(filter): Query<ResourceFilter>,
) -> Result<Json<ApiResponse<Vec<ResourceView>>>, AppError> {
    Ok(ok(state.resources.list(&filter).await?))
}

/// `POST /api/admin/pdfs`
///
/// Records an object that the client already uploaded.
pub async fn record_resource(
    State(state): State<AppState>,
    Json(req): Json<RecordResource>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.resources.record(req).await?;
    Ok((StatusCode::CREATED, ok(view)))
}

/// `GET /api/admin/pdfs/{id}`
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    let resource = state.resources.get(&id).await?;
    Ok(ok(state.resources.view(resource)))
}

/// `PATCH /api/admin/pdfs/{id}`
pub async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(flags): Json<UpdateResourceFlags>,
) -> Result<Json<ApiResponse<ResourceView>>, AppError> {
    Ok(ok(state.resources.update_flags(&id, flags).await?))
}

/// `DELETE /api/admin/pdfs/{id}?purge=true`
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    state.resources.delete(&id, query.purge).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/resources/{id}/download` redirects to a short-lived signed URL.
pub async fn download_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let url = state.resources.download_url(&id).await?;
    Ok(Redirect::temporary(&url))
}

/// `POST /api/admin/resources/upload`
///
/// Legacy single-request path: the server stores the bytes and records the
/// resource in one go.
pub async fn legacy_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = MultipartForm::read(multipart).await?;
    let file = form.take_file()?;

    let semester = form
        .text("semester")
        .ok_or_else(|| AppError::bad_request("semester is required"))?
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("semester must be a number"))?;

    let fields = UploadFields {
        title: form.text("title").unwrap_or_default().to_string(),
        description: form.text("description").map(str::to_string),
        branch: form.text("branch").unwrap_or_default().to_string(),
        semester,
        subject_id: form.text("subjectId").unwrap_or_default().to_string(),
        featured: form.text("featured").is_some_and(is_truthy),
        uploaded_by: form.text("uploadedBy").map(str::to_string),
    };

    let pdf = state
        .resources
        .upload_and_record(fields, &file.file_name, &file.content_type, file.bytes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(LegacyUploadResponse { success: true, pdf }),
    ))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

#[cfg(test)]
mod tests {
    use super::is_truthy;

    #[test]
    fn checkbox_values() {
        assert!(is_truthy("on"));
        assert!(is_truthy(" TRUE "));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
