//! Subject CRUD nested under a branch.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok},
    models::subject::{CreateSubject, Subject, UpdateSubject},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct ListSubjectsQuery {
    pub semester: Option<i64>,
}

/// `GET /api/admin/branches/{id}/subjects`
pub async fn list_subjects(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
    Query(query): Query<ListSubjectsQuery>,
) -> Result<Json<ApiResponse<Vec<Subject>>>, AppError> {
    Ok(ok(state.catalog.list_subjects(&branch_id, query.semester).await?))
}

/// `POST /api/admin/branches/{id}/subjects`
pub async fn create_subject(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
    Json(req): Json<CreateSubject>,
) -> Result<impl IntoResponse, AppError> {
    let subject = state.catalog.create_subject(&branch_id, req).await?;
    Ok((StatusCode::CREATED, ok(subject)))
}

/// `PUT /api/admin/branches/{id}/subjects/{subject_id}`
pub async fn update_subject(
    State(state): State<AppState>,
    Path((branch_id, subject_id)): Path<(String, String)>,
    Json(req): Json<UpdateSubject>,
) -> Result<Json<ApiResponse<Subject>>, AppError> {
    Ok(ok(state
        .catalog
        .update_subject(&branch_id, &subject_id, req)
        .await?))
}

/// `DELETE /api/admin/branches/{id}/subjects/{subject_id}`
pub async fn delete_subject(
    State(state): State<AppState>,
    Path((branch_id, subject_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_subject(&branch_id, &subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
