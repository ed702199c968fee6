//! Branch CRUD and reordering under `/api/admin/branches`.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok},
    models::branch::{Branch, CreateBranch, ReorderBranches, UpdateBranch},
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
pub struct ListBranchesQuery {
    /// Include inactive branches.
    #[serde(default)]
    pub all: bool,
}

/// `GET /api/admin/branches`
pub async fn list_branches(
    State(state): State<AppState>,
    Query(query): Query<ListBranchesQuery>,
) -> Result<Json<ApiResponse<Vec<Branch>>>, AppError> {
    Ok(ok(state.catalog.list_branches(query.all).await?))
}

/// `POST /api/admin/branches`
pub async fn create_branch(
    State(state): State<AppState>,
    Json(req): Json<CreateBranch>,
) -> Result<impl IntoResponse, AppError> {
    let branch = state.catalog.create_branch(req).await?;
    Ok((StatusCode::CREATED, ok(branch)))
}

/// `GET /api/admin/branches/{id}`
pub async fn get_branch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Branch>>, AppError> {
    Ok(ok(state.catalog.get_branch(&id).await?))
}

/// `PUT /api/admin/branches/{id}`; also used to toggle `isActive`.
pub async fn update_branch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBranch>,
) -> Result<Json<ApiResponse<Branch>>, AppError> {
    Ok(ok(state.catalog.update_branch(&id, req).await?))
}

/// `DELETE /api/admin/branches/{id}`
pub async fn delete_branch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_branch(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/admin/branches/reorder`
///
/// Takes the complete ordered list and returns every branch in its new order.
pub async fn reorder_branches(
    State(state): State<AppState>,
    Json(req): Json<ReorderBranches>,
) -> Result<Json<ApiResponse<Vec<Branch>>>, AppError> {
    Ok(ok(state.catalog.reorder_branches(&req.branches).await?))
}
