//! Shared application state handed to every handler.

use crate::services::{
    blog_service::BlogService, catalog_service::CatalogService, object_store::ObjectStore,
    quiz_service::QuizService, resource_service::ResourceService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub store: Arc<dyn ObjectStore>,
    pub catalog: CatalogService,
    pub resources: ResourceService,
    pub blog: BlogService,
    pub quizzes: QuizService,
}

impl AppState {
    /// Wire every service onto one pool and one object store.
    pub fn new(db: Arc<SqlitePool>, store: Arc<dyn ObjectStore>) -> Self {
        let catalog = CatalogService::new(db.clone());
        Self {
            resources: ResourceService::new(db.clone(), store.clone(), catalog.clone()),
            blog: BlogService::new(db.clone()),
            quizzes: QuizService::new(db.clone(), catalog.clone()),
            catalog,
            store,
            db,
        }
    }
}
