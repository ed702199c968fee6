//! HTTP handlers. Successful responses share the `{ success: true, data }`
//! envelope; failures go through [`crate::errors::AppError`].

use axum::Json;
use serde::Serialize;

pub mod blog_handlers;
pub mod branch_handlers;
pub mod health_handlers;
pub mod quiz_handlers;
pub mod resource_handlers;
pub mod subject_handlers;
pub mod upload_handlers;

#[derive(Serialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}
