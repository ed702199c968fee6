//! Core data models for the portal.
//!
//! Rows map to SQLite tables via `sqlx::FromRow` and serialize as camelCase
//! JSON for the API.

pub mod blog;
pub mod branch;
pub mod category;
pub mod quiz;
pub mod resource;
pub mod subject;
