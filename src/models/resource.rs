//! Uploaded study resources (PDFs and friends).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A resource row joined with its subject's display fields.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,

    pub title: String,

    pub description: Option<String>,

    /// Object store key the payload lives under.
    pub file_key: String,

    /// Original client-side file name.
    pub file_name: String,

    pub file_size: i64,

    /// MIME type.
    pub file_type: String,

    /// Branch code, e.g. `CSE`.
    pub branch: String,

    pub semester: i64,

    pub subject_id: Option<String>,

    pub subject_name: Option<String>,

    pub subject_code: Option<String>,

    pub uploaded_by: Option<String>,

    pub featured: bool,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Resource plus its public URL, as returned by the API.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    #[serde(flatten)]
    pub resource: Resource,
    pub file_url: String,
}

/// Metadata for an object that is already in the store.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecordResource {
    pub title: String,
    pub description: Option<String>,
    pub key: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,
    pub branch: String,
    pub semester: i64,
    pub subject_id: String,
    #[serde(default)]
    pub featured: bool,
    pub uploaded_by: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ResourceFilter {
    pub branch: Option<String>,
    pub semester: Option<i64>,
    pub subject_id: Option<String>,
    pub featured: Option<bool>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Flag toggles; the only mutation a resource supports after creation.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceFlags {
    pub featured: Option<bool>,
    pub is_active: Option<bool>,
}
