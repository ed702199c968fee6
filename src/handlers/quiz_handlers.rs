//! MCQ quiz set endpoints.

use crate::{
    errors::AppError,
    handlers::{ApiResponse, ok},
    models::quiz::{CreateQuizSet, QuizSet, QuizSetRow, UpdateQuizSet},
    services::quiz_service::QuizFilter,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// `GET /api/admin/quizzes` lists sets without their questions.
pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(filter): Query<QuizFilter>,
) -> Result<Json<ApiResponse<Vec<QuizSetRow>>>, AppError> {
    Ok(ok(state.quizzes.list(&filter).await?))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizSet>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state.quizzes.create(req).await?;
    Ok((StatusCode::CREATED, ok(quiz)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<QuizSet>>, AppError> {
    Ok(ok(state.quizzes.get(&id).await?))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateQuizSet>,
) -> Result<Json<ApiResponse<QuizSet>>, AppError> {
    Ok(ok(state.quizzes.update(&id, req).await?))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.quizzes.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/quizzes/home`: the landing page preview, slot order.
pub async fn home_preview(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<QuizSet>>>, AppError> {
    Ok(ok(state.quizzes.home_preview().await?))
}
