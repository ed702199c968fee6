use crate::services::{
    blog_service::BlogError, catalog_service::CatalogError, file_validation::ValidationError,
    object_store::ObjectStoreError, quiz_service::QuizError, resource_service::ResourceError,
};
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        }
        let body = Json(json!({
            "success": false,
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::bad_request(err.to_string())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::new(err.status(), err.body_text())
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        match &err {
            ObjectStoreError::NotFound(_) => AppError::not_found(err.to_string()),
            ObjectStoreError::Configuration(_) => {
                AppError::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ObjectStoreError::Network(_) | ObjectStoreError::Provider(_) => {
                AppError::new(StatusCode::BAD_GATEWAY, err.to_string())
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match &err {
            CatalogError::BranchNotFound(_) | CatalogError::SubjectNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            CatalogError::DuplicateBranchCode(_)
            | CatalogError::DuplicateSubjectCode
            | CatalogError::InvalidSemester(_)
            | CatalogError::Invalid(_) => AppError::bad_request(err.to_string()),
            CatalogError::Sqlx(e) => AppError::internal(format!("database error: {}", e)),
        }
    }
}

impl From<ResourceError> for AppError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Invalid(msg) => AppError::bad_request(msg),
            ResourceError::Validation(e) => e.into(),
            ResourceError::Catalog(e) => e.into(),
            ResourceError::Store(e) => e.into(),
            ResourceError::NotFound(id) => {
                AppError::not_found(format!("resource `{}` not found", id))
            }
            ResourceError::Sqlx(e) => AppError::internal(format!("database error: {}", e)),
        }
    }
}

impl From<BlogError> for AppError {
    fn from(err: BlogError) -> Self {
        match &err {
            BlogError::NotFound(_) => AppError::not_found(err.to_string()),
            BlogError::SlugTaken(_) => AppError::conflict(err.to_string()),
            BlogError::Invalid(_) => AppError::bad_request(err.to_string()),
            BlogError::Sqlx(e) => AppError::internal(format!("database error: {}", e)),
        }
    }
}

impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match &err {
            QuizError::NotFound(_) => AppError::not_found(err.to_string()),
            QuizError::Invalid(_) => AppError::bad_request(err.to_string()),
            QuizError::Sqlx(e) => AppError::internal(format!("database error: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_service_errors_to_statuses() {
        let dup: AppError = CatalogError::DuplicateSubjectCode.into();
        assert_eq!(dup.status, StatusCode::BAD_REQUEST);
        assert_eq!(dup.message, "Subject code already exists for this branch");

        let nested: AppError = ResourceError::Catalog(CatalogError::SubjectNotFound("x".into())).into();
        assert_eq!(nested.status, StatusCode::NOT_FOUND);

        let store: AppError = ObjectStoreError::Network("timed out".into()).into();
        assert_eq!(store.status, StatusCode::BAD_GATEWAY);

        let slug: AppError = BlogError::SlugTaken("a".into()).into();
        assert_eq!(slug.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn body_carries_success_flag() {
        let resp = AppError::bad_request("nope").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"success": false, "error": "nope", "status": 400}));
    }
}
