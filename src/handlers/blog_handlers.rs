//! Blog endpoints. `GET /api/blog/{id}` accepts either an id or a slug.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok},
    models::blog::{BlogPost, BlogQuery, CreateBlogPost, UpdateBlogPost},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<ApiResponse<Vec<BlogPost>>>, AppError> {
    Ok(ok(state.blog.list(&query).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(req): Json<CreateBlogPost>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.blog.create(req).await?;
    Ok((StatusCode::CREATED, ok(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BlogPost>>, AppError> {
    Ok(ok(state.blog.get(&id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateBlogPost>,
) -> Result<Json<ApiResponse<BlogPost>>, AppError> {
    Ok(ok(state.blog.update(&id, req).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.blog.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
