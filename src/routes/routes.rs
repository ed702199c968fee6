//! Route table for the portal API.
//!
//! ## Structure
//! - **Catalog** (`/api/admin/branches...`): branch CRUD, reorder, nested subjects
//! - **Resources** (`/api/admin/pdfs...`, `/api/resources/{id}/download`,
//!   `/api/admin/resources/upload`)
//! - **Uploads** (`/api/upload/presigned`, `/api/upload/proxy`)
//! - **Blog** (`/api/blog...`) and **quizzes** (`/api/admin/quizzes...`, `/api/quizzes/home`)
//! - **Probes** (`/healthz`, `/readyz`)
//!
//! `/api/admin/branches/reorder` is a static segment and wins over `{id}`.

use crate::{
    handlers::{
        blog_handlers::{create_post, delete_post, get_post, list_posts, update_post},
        branch_handlers::{
            create_branch, delete_branch, get_branch, list_branches, reorder_branches,
            update_branch,
        },
        health_handlers::{healthz, readyz},
        quiz_handlers::{
            create_quiz, delete_quiz, get_quiz, home_preview, list_quizzes, update_quiz,
        },
        resource_handlers::{
            delete_resource, download_resource, get_resource, legacy_upload, list_resources,
            record_resource, update_resource,
        },
        subject_handlers::{create_subject, delete_subject, list_subjects, update_subject},
        upload_handlers::{presign_upload, proxy_upload},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Build the router for every API route. State is attached by the caller.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Catalog
        .route("/api/admin/branches", get(list_branches).post(create_branch))
        .route("/api/admin/branches/reorder", put(reorder_branches))
        .route(
            "/api/admin/branches/{id}",
            get(get_branch).put(update_branch).delete(delete_branch),
        )
        .route(
            "/api/admin/branches/{id}/subjects",
            get(list_subjects).post(create_subject),
        )
        .route(
            "/api/admin/branches/{id}/subjects/{subject_id}",
            put(update_subject).delete(delete_subject),
        )
        // Resources
        .route("/api/admin/pdfs", get(list_resources).post(record_resource))
        .route(
            "/api/admin/pdfs/{id}",
            get(get_resource)
                .patch(update_resource)
                .delete(delete_resource),
        )
        .route("/api/resources/{id}/download", get(download_resource))
        .route("/api/admin/resources/upload", post(legacy_upload))
        // Uploads
        .route("/api/upload/presigned", post(presign_upload))
        .route("/api/upload/proxy", post(proxy_upload))
        // Blog
        .route("/api/blog", get(list_posts).post(create_post))
        .route(
            "/api/blog/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        // Quizzes
        .route("/api/admin/quizzes", get(list_quizzes).post(create_quiz))
        .route(
            "/api/admin/quizzes/{id}",
            get(get_quiz).put(update_quiz).delete(delete_quiz),
        )
        .route("/api/quizzes/home", get(home_preview))
}
