//! Subjects taught in a branch/semester.
//!
//! A subject is either a first-class `subjects` row or a legacy category row
//! named `BRANCH_{branchId}_SUBJECT_{code}` whose description carries the
//! attributes as JSON. [`SubjectSource`] records which one a value came from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::category::Category;

pub const MIN_SEMESTER: i64 = 1;
pub const MAX_SEMESTER: i64 = 8;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubjectSource {
    Table,
    Legacy,
}

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub code: String,
    pub semester: i64,
    pub credits: i64,
    pub is_core: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// API view of a subject regardless of where it is stored.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub branch_id: String,
    pub name: String,
    pub code: String,
    pub semester: i64,
    pub credits: i64,
    pub is_core: bool,
    pub is_active: bool,
    pub description: Option<String>,
    pub source: SubjectSource,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SubjectRow> for Subject {
    fn from(row: SubjectRow) -> Self {
        Self {
            id: row.id,
            branch_id: row.branch_id,
            name: row.name,
            code: row.code,
            semester: row.semester,
            credits: row.credits,
            is_core: row.is_core,
            is_active: row.is_active,
            description: None,
            source: SubjectSource::Table,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Attributes stored in a legacy category's description column.
///
/// Every field is optional on the way in: the column may hold anything, and
/// [`LegacySubjectMetadata::parse`] never fails.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacySubjectMetadata {
    pub name: Option<String>,
    pub code: Option<String>,
    pub semester: Option<i64>,
    pub credits: Option<i64>,
    pub is_core: Option<bool>,
    pub is_active: Option<bool>,
    pub branch_id: Option<String>,
    pub description: Option<String>,
}

impl LegacySubjectMetadata {
    /// Malformed or missing JSON yields empty metadata.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(text) if !text.trim().is_empty() => {
                serde_json::from_str(text).unwrap_or_else(|err| {
                    tracing::debug!(error = %err, "unparseable legacy subject metadata");
                    Self::default()
                })
            }
            _ => Self::default(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// `BRANCH_{branchId}_SUBJECT_`; the listing query filters on this prefix.
pub fn legacy_prefix(branch_id: &str) -> String {
    format!("BRANCH_{}_SUBJECT_", branch_id)
}

/// `BRANCH_{branchId}_SUBJECT_{code}`
pub fn legacy_key(branch_id: &str, code: &str) -> String {
    format!("{}{}", legacy_prefix(branch_id), code)
}

/// Split a synthetic key back into `(branch_id, code)`.
pub fn parse_legacy_key(name: &str) -> Option<(String, String)> {
    let rest = name.strip_prefix("BRANCH_")?;
    let (branch_id, code) = rest.rsplit_once("_SUBJECT_")?;
    if branch_id.is_empty() || code.is_empty() {
        return None;
    }
    Some((branch_id.to_string(), code.to_string()))
}

/// Codes compare case-insensitively; store them upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Subject {
    /// Reconstruct a subject from a legacy category row. The synthetic name
    /// fills in branch and code when the JSON blob lacks them.
    pub fn from_legacy(category: &Category) -> Self {
        let meta = LegacySubjectMetadata::parse(category.description.as_deref());
        let (key_branch, key_code) = parse_legacy_key(&category.name).unwrap_or_default();
        let code = meta.code.clone().map(|c| normalize_code(&c)).unwrap_or(key_code);

        Self {
            id: category.id.clone(),
            branch_id: meta.branch_id.clone().unwrap_or(key_branch),
            name: meta.name.clone().unwrap_or_else(|| code.clone()),
            code,
            semester: meta.semester.unwrap_or(0),
            credits: meta.credits.unwrap_or(0),
            is_core: meta.is_core.unwrap_or(true),
            is_active: meta.is_active.unwrap_or(true),
            description: meta.description,
            source: SubjectSource::Legacy,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubject {
    pub name: String,
    pub code: String,
    pub semester: i64,
    #[serde(default)]
    pub credits: i64,
    #[serde(default = "default_true")]
    pub is_core: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSubject {
    pub name: Option<String>,
    pub code: Option<String>,
    pub semester: Option<i64>,
    pub credits: Option<i64>,
    pub is_core: Option<bool>,
    pub is_active: Option<bool>,
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(name: &str, description: Option<&str>) -> Category {
        Category {
            id: "cat-1".into(),
            name: name.into(),
            description: description.map(Into::into),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn legacy_key_round_trips() {
        let key = legacy_key("b1", "CN");
        assert_eq!(key, "BRANCH_b1_SUBJECT_CN");
        assert_eq!(parse_legacy_key(&key), Some(("b1".into(), "CN".into())));
        assert_eq!(parse_legacy_key("Announcements"), None);
        assert_eq!(parse_legacy_key("BRANCH__SUBJECT_CN"), None);
    }

    #[test]
    fn malformed_metadata_parses_to_default() {
        assert_eq!(LegacySubjectMetadata::parse(Some("{not json")), LegacySubjectMetadata::default());
        assert_eq!(LegacySubjectMetadata::parse(Some("[1,2]")), LegacySubjectMetadata::default());
        assert_eq!(LegacySubjectMetadata::parse(None), LegacySubjectMetadata::default());
    }

    #[test]
    fn partial_metadata_keeps_known_fields() {
        let meta = LegacySubjectMetadata::parse(Some(r#"{"name":"Computer Networks","semester":5,"extra":true}"#));
        assert_eq!(meta.name.as_deref(), Some("Computer Networks"));
        assert_eq!(meta.semester, Some(5));
        assert_eq!(meta.code, None);
    }

    #[test]
    fn subject_from_legacy_falls_back_to_synthetic_name() {
        let subject = Subject::from_legacy(&category("BRANCH_b1_SUBJECT_CN", Some("garbage")));
        assert_eq!(subject.branch_id, "b1");
        assert_eq!(subject.code, "CN");
        assert_eq!(subject.name, "CN");
        assert_eq!(subject.source, SubjectSource::Legacy);
    }

    #[test]
    fn subject_from_legacy_prefers_metadata() {
        let blob = r#"{"name":"Operating Systems","code":"os","semester":4,"credits":3,"isCore":false}"#;
        let subject = Subject::from_legacy(&category("BRANCH_b2_SUBJECT_OS", Some(blob)));
        assert_eq!(subject.code, "OS");
        assert_eq!(subject.semester, 4);
        assert_eq!(subject.credits, 3);
        assert!(!subject.is_core);
        assert!(subject.is_active);
    }
}
