//! Object storage seam.
//!
//! Everything that talks to the S3-compatible bucket goes through
//! [`ObjectStore`]. The production implementation lives in
//! [`super::r2_store`]; [`super::memory_store`] backs tests and local runs.
//! Instances are constructed once in `main` and injected via `AppState`.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Default lifetime of a presigned URL.
pub const DEFAULT_PRESIGN_EXPIRY: Duration = Duration::from_secs(3600);

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    /// The store cannot be used with the current settings (bad endpoint,
    /// credentials, expiry...). Retrying will not help.
    #[error("object store configuration error: {0}")]
    Configuration(String),
    /// Connectivity problem or timeout talking to the store.
    #[error("object store unreachable: {0}")]
    Network(String),
    /// The provider answered with an error.
    #[error("object store rejected the request: {0}")]
    Provider(String),
    #[error("object `{0}` not found")]
    NotFound(String),
}

pub type ObjectStoreResult<T> = Result<T, ObjectStoreError>;

/// Result of a successful write.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub size_bytes: u64,
    pub etag: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Signed URL allowing a single PUT of `key` with the given content type.
    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String>;

    /// Signed URL allowing a GET of `key`.
    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String>;

    /// Write bytes on behalf of a client (proxy and legacy upload paths).
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> ObjectStoreResult<StoredObject>;

    /// Best-effort delete. Metadata referencing `key` is the caller's problem.
    async fn delete_object(&self, key: &str) -> ObjectStoreResult<()>;

    /// Cheap reachability probe used by `/readyz`.
    async fn probe(&self) -> ObjectStoreResult<()>;

    /// Base URL objects are publicly served from, without trailing slash.
    fn public_base_url(&self) -> &str;

    /// Public URL of `key`. Pure string concatenation, no I/O.
    fn public_url(&self, key: &str) -> String {
        public_url(self.public_base_url(), key)
    }
}

pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}
