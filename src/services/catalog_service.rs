//! src/services/catalog_service.rs
//!
//! CatalogService: branches and their subjects.
//!
//! Subjects created through the admin API use the legacy category encoding
//! (`BRANCH_{branchId}_SUBJECT_{code}` + JSON description). First-class
//! `subjects` rows appear when the resource writer migrates a legacy entry on
//! read. Listings merge both, first-class rows winning on equal codes.

use crate::{
    db::is_unique_violation,
    models::{
        branch::{Branch, BranchPosition, CreateBranch, UpdateBranch},
        category::Category,
        subject::{
            CreateSubject, LegacySubjectMetadata, MAX_SEMESTER, MIN_SEMESTER, Subject, SubjectRow,
            UpdateSubject, legacy_key, legacy_prefix, normalize_code, parse_legacy_key,
        },
    },
};
use chrono::Utc;
use sqlx::SqlitePool;
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("branch `{0}` not found")]
    BranchNotFound(String),
    #[error("subject `{0}` not found")]
    SubjectNotFound(String),
    #[error("branch code `{0}` already exists")]
    DuplicateBranchCode(String),
    #[error("Subject code already exists for this branch")]
    DuplicateSubjectCode,
    #[error("semester must be between 1 and 8, got {0}")]
    InvalidSemester(i64),
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

const BRANCH_COLUMNS: &str =
    "id, name, code, description, icon, color, position, is_active, created_at, updated_at";
const SUBJECT_COLUMNS: &str =
    "id, branch_id, name, code, semester, credits, is_core, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct CatalogService {
    pub db: Arc<SqlitePool>,
}

pub fn ensure_semester(semester: i64) -> CatalogResult<()> {
    if (MIN_SEMESTER..=MAX_SEMESTER).contains(&semester) {
        Ok(())
    } else {
        Err(CatalogError::InvalidSemester(semester))
    }
}

fn required(value: &str, field: &str) -> CatalogResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CatalogError::Invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    // ---------------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------------

    pub async fn list_branches(&self, include_inactive: bool) -> CatalogResult<Vec<Branch>> {
        let sql = format!(
            "SELECT {} FROM branches {} ORDER BY position ASC, name ASC",
            BRANCH_COLUMNS,
            if include_inactive { "" } else { "WHERE is_active = 1" }
        );
        Ok(sqlx::query_as::<_, Branch>(&sql).fetch_all(&*self.db).await?)
    }

    pub async fn get_branch(&self, id: &str) -> CatalogResult<Branch> {
        sqlx::query_as::<_, Branch>(&format!(
            "SELECT {} FROM branches WHERE id = ?",
            BRANCH_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?
        .ok_or_else(|| CatalogError::BranchNotFound(id.to_string()))
    }

    /// Insert a branch. Without a position it is appended; with one, it must
    /// fall within `1..=count + 1` and later branches shift down to make room.
    pub async fn create_branch(&self, req: CreateBranch) -> CatalogResult<Branch> {
        let name = required(&req.name, "name")?;
        let code = normalize_code(&required(&req.code, "code")?);

        let mut tx = self.db.begin().await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM branches")
            .fetch_one(&mut *tx)
            .await?;
        let position = match req.position {
            Some(p) if !(1..=count + 1).contains(&p) => {
                return Err(CatalogError::Invalid(format!(
                    "position must be between 1 and {}",
                    count + 1
                )));
            }
            Some(p) => p,
            None => count + 1,
        };

        let now = Utc::now();
        if position <= count {
            sqlx::query(
                "UPDATE branches SET position = position + 1, updated_at = ? WHERE position >= ?",
            )
            .bind(now)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            name,
            code,
            description: req.description,
            icon: req.icon,
            color: req.color,
            position,
            is_active: req.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let inserted = sqlx::query(
            "INSERT INTO branches (id, name, code, description, icon, color, position, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&branch.id)
        .bind(&branch.name)
        .bind(&branch.code)
        .bind(&branch.description)
        .bind(&branch.icon)
        .bind(&branch.color)
        .bind(branch.position)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .bind(branch.updated_at)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {
                tx.commit().await?;
                info!(branch_id = %branch.id, code = %branch.code, position, "branch created");
                Ok(branch)
            }
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::DuplicateBranchCode(branch.code))
            }
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn update_branch(&self, id: &str, req: UpdateBranch) -> CatalogResult<Branch> {
        let mut branch = self.get_branch(id).await?;

        if let Some(name) = req.name {
            branch.name = required(&name, "name")?;
        }
        if let Some(code) = req.code {
            branch.code = normalize_code(&required(&code, "code")?);
        }
        if req.description.is_some() {
            branch.description = req.description;
        }
        if req.icon.is_some() {
            branch.icon = req.icon;
        }
        if req.color.is_some() {
            branch.color = req.color;
        }
        if let Some(active) = req.is_active {
            branch.is_active = active;
        }
        branch.updated_at = Utc::now();

        match sqlx::query(
            "UPDATE branches SET name = ?, code = ?, description = ?, icon = ?, color = ?,
                    is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&branch.name)
        .bind(&branch.code)
        .bind(&branch.description)
        .bind(&branch.icon)
        .bind(&branch.color)
        .bind(branch.is_active)
        .bind(branch.updated_at)
        .bind(id)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(branch),
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::DuplicateBranchCode(branch.code))
            }
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    /// Delete a branch, its legacy subject categories and (by cascade) its
    /// first-class subjects, then close the gap in positions.
    pub async fn delete_branch(&self, id: &str) -> CatalogResult<()> {
        self.get_branch(id).await?;

        let removed = sqlx::query("DELETE FROM categories WHERE instr(name, ?) = 1")
            .bind(legacy_prefix(id))
            .execute(&*self.db)
            .await?
            .rows_affected();
        debug!(branch_id = id, removed, "removed legacy subject categories");

        let result = sqlx::query("DELETE FROM branches WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::BranchNotFound(id.to_string()));
        }

        let remaining: Vec<String> =
            sqlx::query_scalar("SELECT id FROM branches ORDER BY position ASC, name ASC")
                .fetch_all(&*self.db)
                .await?;
        for (idx, branch_id) in remaining.iter().enumerate() {
            sqlx::query("UPDATE branches SET position = ? WHERE id = ?")
                .bind(idx as i64 + 1)
                .bind(branch_id)
                .execute(&*self.db)
                .await?;
        }

        info!(branch_id = id, "branch deleted");
        Ok(())
    }

    /// Apply a full reordering.
    ///
    /// Each position is written independently; a failure part-way leaves the
    /// earlier writes in place. Applying the same list twice yields the same
    /// assignment.
    pub async fn reorder_branches(&self, order: &[BranchPosition]) -> CatalogResult<Vec<Branch>> {
        if order.is_empty() {
            return Err(CatalogError::Invalid("branches list is empty".into()));
        }
        let mut ids = HashSet::new();
        let mut positions = HashSet::new();
        for entry in order {
            if entry.position < 1 {
                return Err(CatalogError::Invalid("position must be at least 1".into()));
            }
            if !ids.insert(entry.id.as_str()) {
                return Err(CatalogError::Invalid(format!("branch `{}` listed twice", entry.id)));
            }
            if !positions.insert(entry.position) {
                return Err(CatalogError::Invalid(format!(
                    "position {} assigned twice",
                    entry.position
                )));
            }
        }

        let now = Utc::now();
        for (applied, entry) in order.iter().enumerate() {
            let result = sqlx::query("UPDATE branches SET position = ?, updated_at = ? WHERE id = ?")
                .bind(entry.position)
                .bind(now)
                .bind(&entry.id)
                .execute(&*self.db)
                .await?;
            if result.rows_affected() == 0 {
                if applied > 0 {
                    warn!(applied, branch_id = %entry.id, "reorder partially applied");
                }
                return Err(CatalogError::BranchNotFound(entry.id.clone()));
            }
        }

        self.list_branches(true).await
    }

    // ---------------------------------------------------------------------
    // Subjects
    // ---------------------------------------------------------------------

    async fn legacy_categories(&self, branch_id: &str) -> CatalogResult<Vec<Category>> {
        let prefix = legacy_prefix(branch_id);
        let rows = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at
             FROM categories WHERE instr(name, ?) = 1 ORDER BY name ASC",
        )
        .bind(&prefix)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn subject_rows(&self, branch_id: &str) -> CatalogResult<Vec<SubjectRow>> {
        Ok(sqlx::query_as::<_, SubjectRow>(&format!(
            "SELECT {} FROM subjects WHERE branch_id = ?",
            SUBJECT_COLUMNS
        ))
        .bind(branch_id)
        .fetch_all(&*self.db)
        .await?)
    }

    async fn subject_row(&self, id: &str) -> CatalogResult<Option<SubjectRow>> {
        Ok(sqlx::query_as::<_, SubjectRow>(&format!(
            "SELECT {} FROM subjects WHERE id = ?",
            SUBJECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?)
    }

    async fn subject_row_by_code(
        &self,
        branch_id: &str,
        code: &str,
    ) -> CatalogResult<Option<SubjectRow>> {
        Ok(sqlx::query_as::<_, SubjectRow>(&format!(
            "SELECT {} FROM subjects WHERE branch_id = ? AND code = ?",
            SUBJECT_COLUMNS
        ))
        .bind(branch_id)
        .bind(code)
        .fetch_optional(&*self.db)
        .await?)
    }

    async fn category(&self, id: &str) -> CatalogResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            "SELECT id, name, description, created_at, updated_at FROM categories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?)
    }

    /// Advisory duplicate check across both representations.
    async fn code_taken(
        &self,
        branch_id: &str,
        code: &str,
        except_id: Option<&str>,
    ) -> CatalogResult<bool> {
        let table_hit = self
            .subject_row_by_code(branch_id, code)
            .await?
            .is_some_and(|row| Some(row.id.as_str()) != except_id);
        if table_hit {
            return Ok(true);
        }
        let legacy_hit: Option<String> =
            sqlx::query_scalar("SELECT id FROM categories WHERE name = ?")
                .bind(legacy_key(branch_id, code))
                .fetch_optional(&*self.db)
                .await?;
        Ok(legacy_hit.is_some_and(|id| Some(id.as_str()) != except_id))
    }

    /// All subjects of a branch, optionally restricted to one semester.
    pub async fn list_subjects(
        &self,
        branch_id: &str,
        semester: Option<i64>,
    ) -> CatalogResult<Vec<Subject>> {
        self.get_branch(branch_id).await?;

        let mut subjects: Vec<Subject> = self
            .subject_rows(branch_id)
            .await?
            .into_iter()
            .map(Subject::from)
            .collect();
        let known: HashSet<String> = subjects.iter().map(|s| s.code.clone()).collect();

        let prefix = legacy_prefix(branch_id);
        for category in self.legacy_categories(branch_id).await? {
            if !category.name.starts_with(&prefix) {
                continue;
            }
            let subject = Subject::from_legacy(&category);
            if !known.contains(&subject.code) {
                subjects.push(subject);
            }
        }

        if let Some(sem) = semester {
            subjects.retain(|s| s.semester == sem);
        }
        subjects.sort_by(|a, b| a.semester.cmp(&b.semester).then_with(|| a.code.cmp(&b.code)));
        Ok(subjects)
    }

    /// Create a subject using the legacy category encoding.
    pub async fn create_subject(
        &self,
        branch_id: &str,
        req: CreateSubject,
    ) -> CatalogResult<Subject> {
        ensure_semester(req.semester)?;
        let name = required(&req.name, "name")?;
        let code = normalize_code(&required(&req.code, "code")?);
        self.get_branch(branch_id).await?;

        if self.code_taken(branch_id, &code, None).await? {
            return Err(CatalogError::DuplicateSubjectCode);
        }

        let meta = LegacySubjectMetadata {
            name: Some(name),
            code: Some(code.clone()),
            semester: Some(req.semester),
            credits: Some(req.credits),
            is_core: Some(req.is_core),
            is_active: Some(req.is_active),
            branch_id: Some(branch_id.to_string()),
            description: req.description,
        };

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            name: legacy_key(branch_id, &code),
            description: Some(meta.to_json()),
            created_at: now,
            updated_at: now,
        };

        match sqlx::query(
            "INSERT INTO categories (id, name, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => {
                info!(branch_id, code = %code, subject_id = %category.id, "subject created");
                Ok(Subject::from_legacy(&category))
            }
            Err(err) if is_unique_violation(&err) => Err(CatalogError::DuplicateSubjectCode),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn update_subject(
        &self,
        branch_id: &str,
        subject_id: &str,
        req: UpdateSubject,
    ) -> CatalogResult<Subject> {
        if let Some(semester) = req.semester {
            ensure_semester(semester)?;
        }
        let new_code = match &req.code {
            Some(code) => Some(normalize_code(&required(code, "code")?)),
            None => None,
        };
        let new_name = match &req.name {
            Some(name) => Some(required(name, "name")?),
            None => None,
        };

        if let Some(category) = self.category(subject_id).await? {
            if category.name.starts_with(&legacy_prefix(branch_id)) {
                return self
                    .update_legacy_subject(branch_id, category, new_name, new_code, req)
                    .await;
            }
        }

        let mut row = self
            .subject_row(subject_id)
            .await?
            .filter(|row| row.branch_id == branch_id)
            .ok_or_else(|| CatalogError::SubjectNotFound(subject_id.to_string()))?;

        if let Some(code) = new_code {
            if code != row.code && self.code_taken(branch_id, &code, Some(subject_id)).await? {
                return Err(CatalogError::DuplicateSubjectCode);
            }
            row.code = code;
        }
        if let Some(name) = new_name {
            row.name = name;
        }
        if let Some(semester) = req.semester {
            row.semester = semester;
        }
        if let Some(credits) = req.credits {
            row.credits = credits;
        }
        if let Some(is_core) = req.is_core {
            row.is_core = is_core;
        }
        if let Some(is_active) = req.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Utc::now();

        match sqlx::query(
            "UPDATE subjects SET name = ?, code = ?, semester = ?, credits = ?, is_core = ?,
                    is_active = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&row.name)
        .bind(&row.code)
        .bind(row.semester)
        .bind(row.credits)
        .bind(row.is_core)
        .bind(row.is_active)
        .bind(row.updated_at)
        .bind(&row.id)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(row.into()),
            Err(err) if is_unique_violation(&err) => Err(CatalogError::DuplicateSubjectCode),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    async fn update_legacy_subject(
        &self,
        branch_id: &str,
        mut category: Category,
        new_name: Option<String>,
        new_code: Option<String>,
        req: UpdateSubject,
    ) -> CatalogResult<Subject> {
        let current = Subject::from_legacy(&category);
        let mut meta = LegacySubjectMetadata::parse(category.description.as_deref());

        // Backfill from the reconstructed view so a damaged blob heals on write.
        meta.name = Some(new_name.unwrap_or(current.name));
        meta.semester = Some(req.semester.unwrap_or(current.semester));
        meta.credits = Some(req.credits.unwrap_or(current.credits));
        meta.is_core = Some(req.is_core.unwrap_or(current.is_core));
        meta.is_active = Some(req.is_active.unwrap_or(current.is_active));
        meta.branch_id = Some(branch_id.to_string());
        if req.description.is_some() {
            meta.description = req.description;
        }

        let code = match new_code {
            Some(code) if code != current.code => {
                if self.code_taken(branch_id, &code, Some(&category.id)).await? {
                    return Err(CatalogError::DuplicateSubjectCode);
                }
                code
            }
            _ => current.code,
        };
        meta.code = Some(code.clone());

        category.name = legacy_key(branch_id, &code);
        category.description = Some(meta.to_json());
        category.updated_at = Utc::now();

        match sqlx::query(
            "UPDATE categories SET name = ?, description = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.updated_at)
        .bind(&category.id)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(Subject::from_legacy(&category)),
            Err(err) if is_unique_violation(&err) => Err(CatalogError::DuplicateSubjectCode),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn delete_subject(&self, branch_id: &str, subject_id: &str) -> CatalogResult<()> {
        let legacy = sqlx::query("DELETE FROM categories WHERE id = ? AND instr(name, ?) = 1")
            .bind(subject_id)
            .bind(legacy_prefix(branch_id))
            .execute(&*self.db)
            .await?;
        if legacy.rows_affected() > 0 {
            info!(branch_id, subject_id, "legacy subject deleted");
            return Ok(());
        }

        let table = sqlx::query("DELETE FROM subjects WHERE id = ? AND branch_id = ?")
            .bind(subject_id)
            .bind(branch_id)
            .execute(&*self.db)
            .await?;
        if table.rows_affected() == 0 {
            return Err(CatalogError::SubjectNotFound(subject_id.to_string()));
        }
        info!(branch_id, subject_id, "subject deleted");
        Ok(())
    }

    /// Resolve a subject id for a resource, migrating legacy entries.
    ///
    /// Order: first-class row by id, then legacy category by id. A legacy
    /// entry whose branch already has a first-class subject with the same
    /// code resolves to that row; otherwise, when its metadata names the
    /// subject, a first-class row is created from it. `fallback_semester`
    /// fills in a missing or out-of-range semester in the blob.
    pub async fn resolve_subject(
        &self,
        subject_id: &str,
        fallback_semester: i64,
    ) -> CatalogResult<SubjectRow> {
        if let Some(row) = self.subject_row(subject_id).await? {
            return Ok(row);
        }

        let category = self
            .category(subject_id)
            .await?
            .ok_or_else(|| CatalogError::SubjectNotFound(subject_id.to_string()))?;

        let meta = LegacySubjectMetadata::parse(category.description.as_deref());
        let (key_branch, key_code) = parse_legacy_key(&category.name).unwrap_or_default();
        let branch_id = meta.branch_id.clone().unwrap_or(key_branch);
        let code = meta
            .code
            .as_deref()
            .map(normalize_code)
            .unwrap_or_else(|| normalize_code(&key_code));

        if branch_id.is_empty() || code.is_empty() {
            return Err(CatalogError::SubjectNotFound(subject_id.to_string()));
        }

        if let Some(existing) = self.subject_row_by_code(&branch_id, &code).await? {
            return Ok(existing);
        }

        let Some(name) = meta.name.clone().filter(|n| !n.trim().is_empty()) else {
            return Err(CatalogError::SubjectNotFound(subject_id.to_string()));
        };

        self.get_branch(&branch_id).await?;

        let semester = meta
            .semester
            .filter(|s| ensure_semester(*s).is_ok())
            .unwrap_or(fallback_semester);
        ensure_semester(semester)?;

        let now = Utc::now();
        let row = SubjectRow {
            id: Uuid::new_v4().to_string(),
            branch_id,
            name: name.trim().to_string(),
            code,
            semester,
            credits: meta.credits.unwrap_or(0),
            is_core: meta.is_core.unwrap_or(true),
            is_active: meta.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };

        let inserted = sqlx::query(
            "INSERT INTO subjects (id, branch_id, name, code, semester, credits, is_core, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.id)
        .bind(&row.branch_id)
        .bind(&row.name)
        .bind(&row.code)
        .bind(row.semester)
        .bind(row.credits)
        .bind(row.is_core)
        .bind(row.is_active)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&*self.db)
        .await;

        match inserted {
            Ok(_) => {
                info!(
                    legacy_id = %category.id,
                    subject_id = %row.id,
                    code = %row.code,
                    "migrated legacy subject to subjects table"
                );
                Ok(row)
            }
            // Lost a race with a concurrent migration of the same code.
            Err(err) if is_unique_violation(&err) => self
                .subject_row_by_code(&row.branch_id, &row.code)
                .await?
                .ok_or_else(|| CatalogError::SubjectNotFound(subject_id.to_string())),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }
}
