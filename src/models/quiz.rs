//! MCQ quiz sets and their questions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Landing page preview slots run from 1 to this value.
pub const MAX_HOME_PREVIEW_POSITION: i64 = 5;

#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuizSetRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<i64>,
    pub subject_id: Option<String>,
    pub home_preview_position: Option<i64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, FromRow, Debug)]
pub struct QuizQuestionRow {
    pub id: String,
    pub quiz_set_id: String,
    pub position: i64,
    pub prompt: String,
    /// JSON array of option strings.
    pub options: String,
    pub correct_index: i64,
    pub explanation: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: i64,
    pub explanation: Option<String>,
}

impl From<QuizQuestionRow> for QuizQuestion {
    fn from(row: QuizQuestionRow) -> Self {
        Self {
            prompt: row.prompt,
            options: serde_json::from_str(&row.options).unwrap_or_default(),
            correct_index: row.correct_index,
            explanation: row.explanation,
        }
    }
}

#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QuizSet {
    #[serde(flatten)]
    pub set: QuizSetRow,
    pub questions: Vec<QuizQuestion>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizSet {
    pub title: String,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<i64>,
    pub subject_id: Option<String>,
    pub home_preview_position: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// Partial update. `homePreviewPosition: null` clears the slot; omitting the
/// field leaves it alone.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuizSet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<i64>,
    pub subject_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub home_preview_position: Option<Option<i64>>,
    pub is_active: Option<bool>,
    /// Replaces the whole question list when present.
    pub questions: Option<Vec<QuizQuestion>>,
}

fn default_true() -> bool {
    true
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}
