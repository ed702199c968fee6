//! Ways of getting a file into the object store.
//!
//! The orchestrator tries strategies in order until one succeeds.
//! [`DirectUpload`] goes browser-to-bucket through a presigned URL;
//! [`ProxyUpload`] streams the bytes through the portal server.

use crate::client::{
    api::{PortalClient, ProgressFn},
    error::UploadError,
    task::{LocalFile, UploadOutcome},
};
use async_trait::async_trait;

#[async_trait]
pub trait UploadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn upload(
        &self,
        file: &LocalFile,
        category: &str,
        progress: ProgressFn,
    ) -> Result<UploadOutcome, UploadError>;
}

/// Presign, then PUT straight to the store.
pub struct DirectUpload {
    client: PortalClient,
}

impl DirectUpload {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadStrategy for DirectUpload {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn upload(
        &self,
        file: &LocalFile,
        category: &str,
        progress: ProgressFn,
    ) -> Result<UploadOutcome, UploadError> {
        let presigned = self.client.presign(file, category).await?;
        self.client
            .put_presigned(&presigned.presigned_url, &presigned.content_type, file, progress)
            .await?;
        Ok(UploadOutcome {
            key: presigned.key,
            public_url: presigned.public_url,
        })
    }
}

/// Multipart POST to the server, which writes the object itself.
pub struct ProxyUpload {
    client: PortalClient,
}

impl ProxyUpload {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UploadStrategy for ProxyUpload {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn upload(
        &self,
        file: &LocalFile,
        category: &str,
        progress: ProgressFn,
    ) -> Result<UploadOutcome, UploadError> {
        let outcome = self.client.proxy_upload(file, category).await?;
        // The multipart body is sent in one piece; report it all at the end.
        progress(file.size());
        Ok(outcome)
    }
}
