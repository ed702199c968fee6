//! MCQ quiz sets.
//!
//! Home preview slots (1..=5) are unique: giving a set a slot that another
//! set holds takes the slot away from the previous holder. The release and
//! the write commit together.

use crate::{
    models::{
        quiz::{
            CreateQuizSet, MAX_HOME_PREVIEW_POSITION, QuizQuestion, QuizQuestionRow, QuizSet,
            QuizSetRow, UpdateQuizSet,
        },
        subject::MIN_SEMESTER,
    },
    services::catalog_service::{CatalogError, CatalogService, ensure_semester},
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("quiz set `{0}` not found")]
    NotFound(String),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type QuizResult<T> = Result<T, QuizError>;

const SET_COLUMNS: &str = "id, title, description, branch, semester, subject_id, \
     home_preview_position, is_active, created_at, updated_at";

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuizFilter {
    pub branch: Option<String>,
    pub semester: Option<i64>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Clone)]
pub struct QuizService {
    pub db: Arc<SqlitePool>,
    catalog: CatalogService,
}

fn validate_questions(questions: &[QuizQuestion]) -> QuizResult<()> {
    for (idx, q) in questions.iter().enumerate() {
        let n = idx + 1;
        if q.prompt.trim().is_empty() {
            return Err(QuizError::Invalid(format!("question {} has no prompt", n)));
        }
        if q.options.len() < 2 {
            return Err(QuizError::Invalid(format!(
                "question {} needs at least two options",
                n
            )));
        }
        if q.options.iter().any(|o| o.trim().is_empty()) {
            return Err(QuizError::Invalid(format!("question {} has an empty option", n)));
        }
        if q.correct_index < 0 || q.correct_index as usize >= q.options.len() {
            return Err(QuizError::Invalid(format!(
                "question {} correct answer index {} is out of range",
                n, q.correct_index
            )));
        }
    }
    Ok(())
}

fn validate_slot(position: Option<i64>) -> QuizResult<()> {
    match position {
        Some(p) if !(1..=MAX_HOME_PREVIEW_POSITION).contains(&p) => Err(QuizError::Invalid(
            format!("homePreviewPosition must be between 1 and {}", MAX_HOME_PREVIEW_POSITION),
        )),
        _ => Ok(()),
    }
}

fn validate_semester(semester: Option<i64>) -> QuizResult<()> {
    match semester {
        Some(s) => ensure_semester(s).map_err(|e| QuizError::Invalid(e.to_string())),
        None => Ok(()),
    }
}

impl QuizService {
    pub fn new(db: Arc<SqlitePool>, catalog: CatalogService) -> Self {
        Self { db, catalog }
    }

    /// Map a submitted subject id (first-class or legacy) to a `subjects` row id.
    async fn resolve_subject(
        &self,
        subject_id: Option<&str>,
        semester: Option<i64>,
    ) -> QuizResult<Option<String>> {
        let Some(subject_id) = subject_id.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(None);
        };
        match self
            .catalog
            .resolve_subject(subject_id, semester.unwrap_or(MIN_SEMESTER))
            .await
        {
            Ok(row) => Ok(Some(row.id)),
            Err(CatalogError::Sqlx(err)) => Err(QuizError::Sqlx(err)),
            Err(err) => Err(QuizError::Invalid(err.to_string())),
        }
    }

    async fn set_row(&self, id: &str) -> QuizResult<QuizSetRow> {
        sqlx::query_as::<_, QuizSetRow>(&format!(
            "SELECT {} FROM quiz_sets WHERE id = ?",
            SET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| QuizError::NotFound(id.to_string()))
    }

    async fn questions(&self, set_id: &str) -> QuizResult<Vec<QuizQuestion>> {
        let rows = sqlx::query_as::<_, QuizQuestionRow>(
            "SELECT id, quiz_set_id, position, prompt, options, correct_index, explanation
             FROM quiz_questions WHERE quiz_set_id = ? ORDER BY position ASC",
        )
        .bind(set_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows.into_iter().map(QuizQuestion::from).collect())
    }

    async fn replace_questions(
        conn: &mut SqliteConnection,
        set_id: &str,
        questions: &[QuizQuestion],
    ) -> QuizResult<()> {
        sqlx::query("DELETE FROM quiz_questions WHERE quiz_set_id = ?")
            .bind(set_id)
            .execute(&mut *conn)
            .await?;
        for (idx, q) in questions.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quiz_questions (id, quiz_set_id, position, prompt, options, correct_index, explanation)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(set_id)
            .bind(idx as i64 + 1)
            .bind(q.prompt.trim())
            .bind(serde_json::to_string(&q.options).unwrap_or_else(|_| "[]".into()))
            .bind(q.correct_index)
            .bind(&q.explanation)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }

    /// Free `position` unless `owner` already holds it.
    async fn release_slot(conn: &mut SqliteConnection, position: i64, owner: &str) -> QuizResult<()> {
        let moved = sqlx::query(
            "UPDATE quiz_sets SET home_preview_position = NULL, updated_at = ?
             WHERE home_preview_position = ? AND id != ?",
        )
        .bind(Utc::now())
        .bind(position)
        .bind(owner)
        .execute(&mut *conn)
        .await?
        .rows_affected();
        if moved > 0 {
            debug!(position, new_owner = owner, "home preview slot reassigned");
        }
        Ok(())
    }

    pub async fn get(&self, id: &str) -> QuizResult<QuizSet> {
        let set = self.set_row(id).await?;
        let questions = self.questions(id).await?;
        Ok(QuizSet { set, questions })
    }

    pub async fn list(&self, filter: &QuizFilter) -> QuizResult<Vec<QuizSetRow>> {
        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM quiz_sets WHERE 1 = 1",
            SET_COLUMNS
        ));
        if !filter.include_inactive {
            builder.push(" AND is_active = 1");
        }
        if let Some(branch) = &filter.branch {
            builder.push(" AND branch = ");
            builder.push_bind(branch.trim().to_uppercase());
        }
        if let Some(semester) = filter.semester {
            builder.push(" AND semester = ");
            builder.push_bind(semester);
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    /// Active sets holding a preview slot, in slot order.
    pub async fn home_preview(&self) -> QuizResult<Vec<QuizSet>> {
        let sets = sqlx::query_as::<_, QuizSetRow>(&format!(
            "SELECT {} FROM quiz_sets
             WHERE home_preview_position IS NOT NULL AND is_active = 1
             ORDER BY home_preview_position ASC",
            SET_COLUMNS
        ))
        .fetch_all(&*self.db)
        .await?;

        let mut out = Vec::with_capacity(sets.len());
        for set in sets {
            let questions = self.questions(&set.id).await?;
            out.push(QuizSet { set, questions });
        }
        Ok(out)
    }

    pub async fn create(&self, req: CreateQuizSet) -> QuizResult<QuizSet> {
        let title = req.title.trim().to_string();
        if title.is_empty() {
            return Err(QuizError::Invalid("title is required".into()));
        }
        validate_slot(req.home_preview_position)?;
        validate_semester(req.semester)?;
        validate_questions(&req.questions)?;
        let subject_id = self
            .resolve_subject(req.subject_id.as_deref(), req.semester)
            .await?;

        let id = Uuid::new_v4().to_string();
        let mut tx = self.db.begin().await?;
        if let Some(position) = req.home_preview_position {
            Self::release_slot(&mut tx, position, &id).await?;
        }

        let now = Utc::now();
        sqlx::query(
            "INSERT INTO quiz_sets (id, title, description, branch, semester, subject_id,
                                    home_preview_position, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&req.description)
        .bind(req.branch.as_deref().map(|b| b.trim().to_uppercase()))
        .bind(req.semester)
        .bind(&subject_id)
        .bind(req.home_preview_position)
        .bind(req.is_active)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        Self::replace_questions(&mut tx, &id, &req.questions).await?;
        tx.commit().await?;
        info!(quiz_id = %id, questions = req.questions.len(), "quiz set created");
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, req: UpdateQuizSet) -> QuizResult<QuizSet> {
        let mut set = self.set_row(id).await?;

        if let Some(title) = req.title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(QuizError::Invalid("title is required".into()));
            }
            set.title = title;
        }
        if req.description.is_some() {
            set.description = req.description;
        }
        if let Some(branch) = req.branch {
            set.branch = Some(branch.trim().to_uppercase());
        }
        if req.semester.is_some() {
            validate_semester(req.semester)?;
            set.semester = req.semester;
        }
        if let Some(subject_id) = req.subject_id.as_deref() {
            set.subject_id = self.resolve_subject(Some(subject_id), set.semester).await?;
        }
        if let Some(active) = req.is_active {
            set.is_active = active;
        }
        if let Some(slot) = req.home_preview_position {
            validate_slot(slot)?;
            set.home_preview_position = slot;
        }
        if let Some(questions) = &req.questions {
            validate_questions(questions)?;
        }

        let mut tx = self.db.begin().await?;
        if let Some(position) = set.home_preview_position {
            Self::release_slot(&mut tx, position, id).await?;
        }

        sqlx::query(
            "UPDATE quiz_sets SET title = ?, description = ?, branch = ?, semester = ?, subject_id = ?,
                    home_preview_position = ?, is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&set.title)
        .bind(&set.description)
        .bind(&set.branch)
        .bind(set.semester)
        .bind(&set.subject_id)
        .bind(set.home_preview_position)
        .bind(set.is_active)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(questions) = &req.questions {
            Self::replace_questions(&mut tx, id, questions).await?;
        }
        tx.commit().await?;
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> QuizResult<()> {
        let result = sqlx::query("DELETE FROM quiz_sets WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(QuizError::NotFound(id.to_string()));
        }
        info!(quiz_id = id, "quiz set deleted");
        Ok(())
    }
}
