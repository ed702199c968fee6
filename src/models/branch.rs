//! Engineering branches (CSE, ECE, ...) that group subjects and resources.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,

    pub name: String,

    /// Short code shown in URLs and resource keys, e.g. `CSE`.
    pub code: String,

    pub description: Option<String>,

    pub icon: Option<String>,

    /// Color theme token used by the front end.
    pub color: Option<String>,

    /// 1-based display position; dense and unique after a reorder.
    pub position: i64,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateBranch {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    /// Appended after the current last branch when omitted.
    pub position: Option<i64>,
    pub is_active: Option<bool>,
}

/// Partial update; absent fields are left untouched.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranch {
    pub name: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct BranchPosition {
    pub id: String,
    pub position: i64,
}

#[derive(Deserialize, Debug)]
pub struct ReorderBranches {
    pub branches: Vec<BranchPosition>,
}
