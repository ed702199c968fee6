//! src/services/resource_service.rs
//!
//! ResourceService: records uploaded files as resources.
//!
//! Two entry points:
//! - [`ResourceService::record`]: the object is already in the store
//!   (presigned or proxy upload); only metadata is written.
//! - [`ResourceService::upload_and_record`]: legacy multipart path; the
//!   bytes are written to the store first, then metadata.
//!
//! A store failure aborts before any resource row is written. A database
//! failure after a successful store write leaves the object orphaned; it is
//! logged and not cleaned up.

use crate::{
    models::{
        resource::{RecordResource, Resource, ResourceFilter, ResourceView, UpdateResourceFlags},
        subject::SubjectRow,
    },
    services::{
        catalog_service::{CatalogError, CatalogService, ensure_semester},
        file_keys::generate_resource_key,
        file_validation::{ValidationError, normalize_content_type, validate_file},
        object_store::{DEFAULT_PRESIGN_EXPIRY, ObjectStore, ObjectStoreError},
    },
};
use bytes::Bytes;
use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Store category used for resource files.
pub const RESOURCE_CATEGORY: &str = "pdfs";

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
    #[error("resource `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ResourceResult<T> = Result<T, ResourceError>;

const RESOURCE_SELECT: &str = "SELECT r.id, r.title, r.description, r.file_key, r.file_name, r.file_size,
        r.file_type, r.branch, r.semester, r.subject_id, s.name AS subject_name,
        s.code AS subject_code, r.uploaded_by, r.featured, r.is_active, r.created_at, r.updated_at
     FROM resources r LEFT JOIN subjects s ON s.id = r.subject_id";

/// Descriptive fields for the legacy multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFields {
    pub title: String,
    pub description: Option<String>,
    pub branch: String,
    pub semester: i64,
    pub subject_id: String,
    pub featured: bool,
    pub uploaded_by: Option<String>,
}

#[derive(Clone)]
pub struct ResourceService {
    pub db: Arc<SqlitePool>,
    pub store: Arc<dyn ObjectStore>,
    pub catalog: CatalogService,
}

fn required(value: &str, field: &str) -> ResourceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ResourceError::Invalid(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

impl ResourceService {
    pub fn new(db: Arc<SqlitePool>, store: Arc<dyn ObjectStore>, catalog: CatalogService) -> Self {
        Self { db, store, catalog }
    }

    pub fn view(&self, resource: Resource) -> ResourceView {
        ResourceView {
            file_url: self.store.public_url(&resource.file_key),
            resource,
        }
    }

    /// Record metadata for an object already in the store.
    pub async fn record(&self, req: RecordResource) -> ResourceResult<ResourceView> {
        let title = required(&req.title, "title")?;
        let branch = required(&req.branch, "branch")?.to_uppercase();
        let subject_id = required(&req.subject_id, "subjectId")?;
        let key = required(&req.key, "key")?;
        if key.contains("..") || key.starts_with('/') {
            return Err(ResourceError::Invalid("key is not a valid object key".into()));
        }
        ensure_semester(req.semester).map_err(ResourceError::Catalog)?;
        let file_size = u64::try_from(req.file_size)
            .map_err(|_| ResourceError::Invalid("fileSize must not be negative".into()))?;
        validate_file(&req.file_name, &req.file_type, file_size)?;

        let subject = self.catalog.resolve_subject(&subject_id, req.semester).await?;
        self.ensure_same_branch(&subject, &branch).await?;

        let resource = self
            .insert(NewResource {
                title,
                description: req.description,
                file_key: key,
                file_name: req.file_name,
                file_size: req.file_size,
                file_type: normalize_content_type(&req.file_type),
                branch,
                semester: req.semester,
                subject_id: subject.id,
                uploaded_by: req.uploaded_by,
                featured: req.featured,
            })
            .await?;
        Ok(self.view(resource))
    }

    /// Legacy path: validate, write bytes under
    /// `pdfs/{branch}/{semester}/{uuid}.{ext}`, then record.
    pub async fn upload_and_record(
        &self,
        fields: UploadFields,
        file_name: &str,
        content_type: &str,
        body: Bytes,
    ) -> ResourceResult<ResourceView> {
        let title = required(&fields.title, "title")?;
        let branch = required(&fields.branch, "branch")?.to_uppercase();
        let subject_id = required(&fields.subject_id, "subjectId")?;
        ensure_semester(fields.semester).map_err(ResourceError::Catalog)?;
        validate_file(file_name, content_type, body.len() as u64)?;

        let subject = self.catalog.resolve_subject(&subject_id, fields.semester).await?;
        self.ensure_same_branch(&subject, &branch).await?;

        let content_type = normalize_content_type(content_type);
        let key = generate_resource_key(RESOURCE_CATEGORY, &branch, fields.semester, file_name);
        let stored = self.store.put_object(&key, &content_type, body).await?;

        let inserted = self
            .insert(NewResource {
                title,
                description: fields.description,
                file_key: stored.key.clone(),
                file_name: file_name.to_string(),
                file_size: stored.size_bytes as i64,
                file_type: content_type,
                branch,
                semester: fields.semester,
                subject_id: subject.id,
                uploaded_by: fields.uploaded_by,
                featured: fields.featured,
            })
            .await;

        match inserted {
            Ok(resource) => Ok(self.view(resource)),
            Err(err) => {
                error!(key = %stored.key, error = %err, "resource metadata write failed; object left orphaned");
                Err(err)
            }
        }
    }

    /// The resolved subject must belong to the branch the resource is filed under.
    async fn ensure_same_branch(&self, subject: &SubjectRow, branch: &str) -> ResourceResult<()> {
        let owner = self.catalog.get_branch(&subject.branch_id).await?;
        if owner.code != branch {
            return Err(ResourceError::Invalid(format!(
                "subject `{}` belongs to branch {}, not {}",
                subject.code, owner.code, branch
            )));
        }
        Ok(())
    }

    async fn insert(&self, new: NewResource) -> ResourceResult<Resource> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO resources (id, title, description, file_key, file_name, file_size, file_type,
                                    branch, semester, subject_id, uploaded_by, featured, is_active,
                                    created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.file_key)
        .bind(&new.file_name)
        .bind(new.file_size)
        .bind(&new.file_type)
        .bind(&new.branch)
        .bind(new.semester)
        .bind(&new.subject_id)
        .bind(&new.uploaded_by)
        .bind(new.featured)
        .bind(now)
        .bind(now)
        .execute(&*self.db)
        .await?;

        info!(resource_id = %id, key = %new.file_key, branch = %new.branch, semester = new.semester, "resource recorded");
        self.get(&id).await
    }

    pub async fn get(&self, id: &str) -> ResourceResult<Resource> {
        sqlx::query_as::<_, Resource>(&format!("{} WHERE r.id = ?", RESOURCE_SELECT))
            .bind(id)
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| ResourceError::NotFound(id.to_string()))
    }

    pub async fn list(&self, filter: &ResourceFilter) -> ResourceResult<Vec<ResourceView>> {
        let mut builder = QueryBuilder::<Sqlite>::new(RESOURCE_SELECT);
        builder.push(" WHERE 1 = 1");

        if !filter.include_inactive {
            builder.push(" AND r.is_active = 1");
        }
        if let Some(branch) = &filter.branch {
            builder.push(" AND r.branch = ");
            builder.push_bind(branch.trim().to_uppercase());
        }
        if let Some(semester) = filter.semester {
            builder.push(" AND r.semester = ");
            builder.push_bind(semester);
        }
        if let Some(subject_id) = &filter.subject_id {
            builder.push(" AND r.subject_id = ");
            builder.push_bind(subject_id.clone());
        }
        if let Some(featured) = filter.featured {
            builder.push(" AND r.featured = ");
            builder.push_bind(featured);
        }
        builder.push(" ORDER BY r.featured DESC, r.created_at DESC");

        let rows: Vec<Resource> = builder.build_query_as().fetch_all(&*self.db).await?;
        Ok(rows.into_iter().map(|r| self.view(r)).collect())
    }

    pub async fn update_flags(
        &self,
        id: &str,
        flags: UpdateResourceFlags,
    ) -> ResourceResult<ResourceView> {
        let current = self.get(id).await?;
        let featured = flags.featured.unwrap_or(current.featured);
        let is_active = flags.is_active.unwrap_or(current.is_active);

        sqlx::query("UPDATE resources SET featured = ?, is_active = ?, updated_at = ? WHERE id = ?")
            .bind(featured)
            .bind(is_active)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;

        Ok(self.view(self.get(id).await?))
    }

    /// Remove the resource row. With `purge` the object is deleted too,
    /// best-effort: a store failure is logged and the row stays deleted.
    pub async fn delete(&self, id: &str, purge: bool) -> ResourceResult<Resource> {
        let resource = self.get(id).await?;
        let result = sqlx::query("DELETE FROM resources WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ResourceError::NotFound(id.to_string()));
        }

        if purge {
            if let Err(err) = self.store.delete_object(&resource.file_key).await {
                warn!(key = %resource.file_key, error = %err, "object purge failed");
            }
        }
        info!(resource_id = id, purge, "resource deleted");
        Ok(resource)
    }

    pub async fn download_url(&self, id: &str) -> ResourceResult<String> {
        let resource = self.get(id).await?;
        if !resource.is_active {
            return Err(ResourceError::NotFound(id.to_string()));
        }
        Ok(self
            .store
            .presigned_download_url(&resource.file_key, DEFAULT_PRESIGN_EXPIRY)
            .await?)
    }
}

struct NewResource {
    title: String,
    description: Option<String>,
    file_key: String,
    file_name: String,
    file_size: i64,
    file_type: String,
    branch: String,
    semester: i64,
    subject_id: String,
    uploaded_by: Option<String>,
    featured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::connect_in_memory,
        models::{branch::CreateBranch, subject::CreateSubject},
        services::memory_store::MemoryObjectStore,
    };

    struct Fixture {
        svc: ResourceService,
        store: MemoryObjectStore,
        subject_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(connect_in_memory().await.unwrap());
        let catalog = CatalogService::new(db.clone());
        let branch = catalog
            .create_branch(CreateBranch {
                name: "Computer Science".into(),
                code: "CSE".into(),
                description: None,
                icon: None,
                color: None,
                position: None,
                is_active: None,
            })
            .await
            .unwrap();
        let subject = catalog
            .create_subject(
                &branch.id,
                CreateSubject {
                    name: "Computer Networks".into(),
                    code: "CN".into(),
                    semester: 5,
                    credits: 4,
                    is_core: true,
                    is_active: true,
                    description: None,
                },
            )
            .await
            .unwrap();
        let store = MemoryObjectStore::new("https://cdn.test");
        Fixture {
            svc: ResourceService::new(db, Arc::new(store.clone()), catalog),
            store,
            subject_id: subject.id,
        }
    }

    fn fields(subject_id: &str) -> UploadFields {
        UploadFields {
            title: "CN Unit 1".into(),
            description: None,
            branch: "cse".into(),
            semester: 5,
            subject_id: subject_id.into(),
            featured: false,
            uploaded_by: Some("admin@example.com".into()),
        }
    }

    #[tokio::test]
    async fn legacy_upload_writes_object_then_metadata() {
        let f = fixture().await;
        let view = f
            .svc
            .upload_and_record(fields(&f.subject_id), "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF-1.7"))
            .await
            .unwrap();

        let key = &view.resource.file_key;
        assert!(key.starts_with("pdfs/CSE/5/") && key.ends_with(".pdf"), "{key}");
        assert_eq!(view.file_url, format!("https://cdn.test/{}", key));
        assert_eq!(view.resource.branch, "CSE");
        assert_eq!(view.resource.subject_name.as_deref(), Some("Computer Networks"));
        assert_eq!(view.resource.subject_code.as_deref(), Some("CN"));
        assert!(f.store.get(key).await.is_some());
    }

    #[tokio::test]
    async fn store_failure_writes_no_metadata() {
        let f = fixture().await;
        f.store.fail_writes(true);
        let err = f
            .svc
            .upload_and_record(fields(&f.subject_id), "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Store(_)));
        assert!(f.svc.list(&ResourceFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_file_never_reaches_store() {
        let f = fixture().await;
        let err = f
            .svc
            .upload_and_record(fields(&f.subject_id), "virus.exe", "application/x-msdownload", Bytes::from_static(b"MZ"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Validation(_)));
        assert!(f.store.keys().await.is_empty());
    }

    #[tokio::test]
    async fn record_round_trips_through_listing() {
        let f = fixture().await;
        let recorded = f
            .svc
            .record(RecordResource {
                title: "DS Notes".into(),
                description: Some("Unit 2".into()),
                key: "pdfs/1700000000000-abcd1234-ds.pdf".into(),
                file_name: "ds.pdf".into(),
                file_size: 1024,
                file_type: "application/pdf".into(),
                branch: "CSE".into(),
                semester: 5,
                subject_id: f.subject_id.clone(),
                featured: true,
                uploaded_by: None,
            })
            .await
            .unwrap();

        let listed = f
            .svc
            .list(&ResourceFilter { branch: Some("cse".into()), semester: Some(5), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        let got = &listed[0].resource;
        assert_eq!(got.id, recorded.resource.id);
        assert_eq!(got.title, "DS Notes");
        assert_eq!(got.branch, "CSE");
        assert_eq!(got.semester, 5);
        assert_eq!(got.subject_name.as_deref(), Some("Computer Networks"));
    }

    #[tokio::test]
    async fn record_rejects_bad_semester_and_unknown_subject() {
        let f = fixture().await;
        let base = RecordResource {
            title: "x".into(),
            description: None,
            key: "pdfs/k.pdf".into(),
            file_name: "k.pdf".into(),
            file_size: 10,
            file_type: "application/pdf".into(),
            branch: "CSE".into(),
            semester: 9,
            subject_id: f.subject_id.clone(),
            featured: false,
            uploaded_by: None,
        };
        assert!(matches!(
            f.svc.record(base.clone()).await.unwrap_err(),
            ResourceError::Catalog(CatalogError::InvalidSemester(9))
        ));
        let unknown = RecordResource { semester: 5, subject_id: "missing".into(), ..base };
        assert!(matches!(
            f.svc.record(unknown).await.unwrap_err(),
            ResourceError::Catalog(CatalogError::SubjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn subject_from_another_branch_is_rejected() {
        let f = fixture().await;
        let mut other = fields(&f.subject_id);
        other.branch = "ECE".into();
        let err = f
            .svc
            .upload_and_record(other, "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Invalid(_)));
        assert!(f.store.keys().await.is_empty());

        let record = RecordResource {
            title: "x".into(),
            description: None,
            key: "pdfs/k.pdf".into(),
            file_name: "k.pdf".into(),
            file_size: 10,
            file_type: "application/pdf".into(),
            branch: "ece".into(),
            semester: 5,
            subject_id: f.subject_id.clone(),
            featured: false,
            uploaded_by: None,
        };
        assert!(matches!(f.svc.record(record).await.unwrap_err(), ResourceError::Invalid(_)));
        assert!(f.svc.list(&ResourceFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flags_and_delete() {
        let f = fixture().await;
        let view = f
            .svc
            .upload_and_record(fields(&f.subject_id), "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        let id = view.resource.id.clone();

        let hidden = f
            .svc
            .update_flags(&id, UpdateResourceFlags { is_active: Some(false), featured: Some(true) })
            .await
            .unwrap();
        assert!(!hidden.resource.is_active);
        assert!(hidden.resource.featured);
        assert!(f.svc.list(&ResourceFilter::default()).await.unwrap().is_empty());
        assert!(matches!(f.svc.download_url(&id).await.unwrap_err(), ResourceError::NotFound(_)));

        // Without purge the object stays behind.
        f.svc.delete(&id, false).await.unwrap();
        assert!(f.store.get(&view.resource.file_key).await.is_some());
        assert!(matches!(f.svc.get(&id).await.unwrap_err(), ResourceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_with_purge_removes_object() {
        let f = fixture().await;
        let view = f
            .svc
            .upload_and_record(fields(&f.subject_id), "notes.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        f.svc.delete(&view.resource.id, true).await.unwrap();
        assert!(f.store.keys().await.is_empty());
    }
}
