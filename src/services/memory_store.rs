//! In-process [`ObjectStore`] used by tests and `--storage memory` dev runs.
//!
//! Presigned URLs point at a fake host and carry the expiry as a query
//! parameter; nothing validates them.

use crate::services::object_store::{
    ObjectStore, ObjectStoreError, ObjectStoreResult, StoredObject,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct MemoryObject {
    pub content_type: String,
    pub body: Bytes,
    pub etag: String,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Arc<RwLock<HashMap<String, MemoryObject>>>,
    public_url: String,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryObjectStore {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::default(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            fail_writes: Arc::default(),
        }
    }

    /// Make every subsequent `put_object` fail with a provider error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn get(&self, key: &str) -> Option<MemoryObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        Ok(format!(
            "https://memory.invalid/{}?op=put&expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        if !self.objects.read().await.contains_key(key) {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        Ok(format!(
            "https://memory.invalid/{}?op=get&expires={}",
            key,
            expires_in.as_secs()
        ))
    }

    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> ObjectStoreResult<StoredObject> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ObjectStoreError::Provider("write rejected".into()));
        }
        let etag = format!("{:x}", md5::compute(&body));
        let size_bytes = body.len() as u64;
        self.objects.write().await.insert(
            key.to_string(),
            MemoryObject {
                content_type: content_type.to_string(),
                body,
                etag: etag.clone(),
            },
        );
        Ok(StoredObject {
            key: key.to_string(),
            size_bytes,
            etag: Some(etag),
        })
    }

    async fn delete_object(&self, key: &str) -> ObjectStoreResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete() {
        let store = MemoryObjectStore::new("https://cdn.test/");
        let stored = store
            .put_object("pdfs/a.pdf", "application/pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert_eq!(stored.size_bytes, 4);
        assert_eq!(store.keys().await, vec!["pdfs/a.pdf".to_string()]);
        assert_eq!(store.public_url("pdfs/a.pdf"), "https://cdn.test/pdfs/a.pdf");

        store.delete_object("pdfs/a.pdf").await.unwrap();
        assert!(store.get("pdfs/a.pdf").await.is_none());
    }

    #[tokio::test]
    async fn injected_write_failure() {
        let store = MemoryObjectStore::new("https://cdn.test");
        store.fail_writes(true);
        let err = store
            .put_object("k", "text/plain", Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::Provider(_)));
    }
}
