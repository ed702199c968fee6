//! HTTP client for the portal API and presigned object store PUTs.

use crate::{
    client::{
        error::UploadError,
        optimistic::Optimistic,
        task::{LocalFile, UploadOutcome},
    },
    models::{
        branch::Branch,
        resource::{RecordResource, ResourceView},
    },
};
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tracing::debug;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Granularity of progress callbacks during a direct PUT.
const PROGRESS_CHUNK: usize = 64 * 1024;

/// Called with the cumulative number of bytes sent.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest<'a> {
    pub file_name: &'a str,
    pub file_size: u64,
    pub content_type: &'a str,
    pub category: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub presigned_url: String,
    pub public_url: String,
    pub key: String,
    /// Signed `Content-Type`; [`PortalClient::put_presigned`] sends exactly this.
    pub content_type: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Clone)]
pub struct PortalClient {
    client: Client,
    base_url: String,
}

/// Builder for configuring a [`PortalClient`].
#[derive(Debug)]
pub struct PortalClientBuilder {
    base_url: String,
    timeout: Duration,
    client: Option<Client>,
}

impl PortalClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            client: None,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<PortalClient, UploadError> {
        let client = match self.client {
            Some(c) => c,
            None => Client::builder()
                .timeout(self.timeout)
                .build()
                .map_err(|e| UploadError::Configuration(e.to_string()))?,
        };
        Ok(PortalClient {
            client,
            base_url: self.base_url,
        })
    }
}

impl PortalClient {
    pub fn builder(base_url: impl Into<String>) -> PortalClientBuilder {
        PortalClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Unwrap the `{ success, data }` envelope, or turn the error body into
    /// [`UploadError::Server`].
    async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, UploadError> {
        let status = response.status();
        if status.is_success() {
            let envelope: Envelope<T> = response.json().await?;
            return Ok(envelope.data);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or(text);
        Err(UploadError::Server {
            status: status.as_u16(),
            message,
        })
    }

    pub async fn health(&self) -> Result<bool, UploadError> {
        let response = self.client.get(self.url("/healthz")).send().await?;
        Ok(response.status().is_success())
    }

    /// `POST /api/upload/presigned`
    pub async fn presign(
        &self,
        file: &LocalFile,
        category: &str,
    ) -> Result<PresignedUpload, UploadError> {
        let body = PresignRequest {
            file_name: &file.name,
            file_size: file.size(),
            content_type: &file.content_type,
            category,
        };
        let response = self
            .client
            .post(self.url("/api/upload/presigned"))
            .json(&body)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// PUT the file body straight to a presigned URL, reporting progress as
    /// chunks are handed to the transport.
    ///
    /// `content_type` is part of the signature, so it must be the value the
    /// server signed rather than the file's own.
    pub async fn put_presigned(
        &self,
        url: &str,
        content_type: &str,
        file: &LocalFile,
        progress: ProgressFn,
    ) -> Result<(), UploadError> {
        let total = file.bytes.len();
        let chunks: Vec<Bytes> = (0..total)
            .step_by(PROGRESS_CHUNK)
            .map(|start| file.bytes.slice(start..(start + PROGRESS_CHUNK).min(total)))
            .collect();

        let sent = Arc::new(AtomicU64::new(0));
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            let so_far = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
            progress(so_far);
            Ok::<Bytes, std::io::Error>(chunk)
        });

        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::ObjectStore {
                status: status.as_u16(),
                message,
            });
        }
        debug!(bytes = total, "presigned PUT complete");
        Ok(())
    }

    /// `POST /api/upload/proxy`
    pub async fn proxy_upload(
        &self,
        file: &LocalFile,
        category: &str,
    ) -> Result<UploadOutcome, UploadError> {
        let part = reqwest::multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| UploadError::Configuration(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("category", category.to_string())
            .part("file", part);

        let response = self
            .client
            .post(self.url("/api/upload/proxy"))
            .multipart(form)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// `POST /api/admin/pdfs`
    pub async fn record_resource(&self, req: &RecordResource) -> Result<ResourceView, UploadError> {
        let response = self
            .client
            .post(self.url("/api/admin/pdfs"))
            .json(req)
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// `PUT /api/admin/branches/{id}` with only `isActive`.
    pub async fn set_branch_active(&self, id: &str, active: bool) -> Result<Branch, UploadError> {
        let response = self
            .client
            .put(self.url(&format!("/api/admin/branches/{}", id)))
            .json(&serde_json::json!({ "isActive": active }))
            .send()
            .await?;
        Self::read_envelope(response).await
    }

    /// Flip a branch's active flag locally first, then reconcile with the
    /// server. On failure the local value rolls back.
    pub async fn toggle_branch_active(
        &self,
        branch: &mut Optimistic<Branch>,
    ) -> Result<(), UploadError> {
        let mut proposed = branch.value().clone();
        proposed.is_active = !proposed.is_active;
        let id = proposed.id.clone();
        let active = proposed.is_active;
        branch
            .apply(proposed, |_| self.set_branch_active(&id, active))
            .await
            .map(|_| ())
    }
}
