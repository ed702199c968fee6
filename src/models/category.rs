//! Generic category rows.
//!
//! Besides plain categories this table hosts the legacy subject encoding:
//! `name = BRANCH_{branchId}_SUBJECT_{code}` and `description` holds a JSON
//! blob with the subject attributes (see `models::subject::LegacySubjectMetadata`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
