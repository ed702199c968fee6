//! Cloudflare R2 (or any S3-compatible endpoint) backed [`ObjectStore`].

use crate::{
    config::StorageConfig,
    services::object_store::{ObjectStore, ObjectStoreError, ObjectStoreResult, StoredObject},
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client as S3Client,
    config::{BehaviorVersion, Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
};
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub struct R2ObjectStore {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl R2ObjectStore {
    /// Build the S3 client from static credentials. No network I/O happens here.
    pub fn new(config: &StorageConfig) -> ObjectStoreResult<Self> {
        if !(config.endpoint.starts_with("https://") || config.endpoint.starts_with("http://")) {
            return Err(ObjectStoreError::Configuration(format!(
                "endpoint `{}` must be an http(s) URL",
                config.endpoint
            )));
        }

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "r2-static",
        );

        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(&config.endpoint)
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        info!(
            bucket = %config.bucket,
            region = %config.region,
            account = %config.account_id,
            "object store client initialized"
        );

        Ok(Self {
            client: S3Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
        })
    }

    fn presigning(expires_in: Duration) -> ObjectStoreResult<PresigningConfig> {
        PresigningConfig::expires_in(expires_in)
            .map_err(|err| ObjectStoreError::Configuration(err.to_string()))
    }
}

/// Map SDK failures onto the configuration / network / provider split.
fn classify<E, R>(err: SdkError<E, R>) -> ObjectStoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::ConstructionFailure(_) => ObjectStoreError::Configuration(message),
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            ObjectStoreError::Network(message)
        }
        _ => ObjectStoreError::Provider(message),
    }
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    #[instrument(skip(self))]
    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(classify)?;
        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self))]
    async fn presigned_download_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> ObjectStoreResult<String> {
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(expires_in)?)
            .await
            .map_err(classify)?;
        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self, body), fields(size_bytes = body.len()))]
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Bytes,
    ) -> ObjectStoreResult<StoredObject> {
        let size_bytes = body.len() as u64;
        let content_md5 = general_purpose::STANDARD.encode(md5::compute(&body).0);

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_md5(content_md5)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(classify)?;

        debug!(key, size_bytes, "object written");
        Ok(StoredObject {
            key: key.to_string(),
            size_bytes,
            etag: output.e_tag().map(|e| e.trim_matches('"').to_string()),
        })
    }

    #[instrument(skip(self))]
    async fn delete_object(&self, key: &str) -> ObjectStoreResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let err = classify(err);
                warn!(key, error = %err, "object delete failed");
                err
            })?;
        debug!(key, "object deleted");
        Ok(())
    }

    async fn probe(&self) -> ObjectStoreResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(classify)?;
        Ok(())
    }

    fn public_base_url(&self) -> &str {
        &self.public_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: &str) -> StorageConfig {
        StorageConfig {
            account_id: "acct".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "wJalrXUtnFEMI".into(),
            bucket: "resources".into(),
            region: "auto".into(),
            endpoint: endpoint.into(),
            public_url: "https://cdn.example.com/".into(),
        }
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = R2ObjectStore::new(&config("acct.r2.cloudflarestorage.com")).err();
        assert!(matches!(err, Some(ObjectStoreError::Configuration(_))));
    }

    #[tokio::test]
    async fn presigns_put_without_network() {
        let store = R2ObjectStore::new(&config("https://acct.r2.cloudflarestorage.com")).unwrap();
        let url = store
            .presigned_upload_url("pdfs/1-abc-notes.pdf", "application/pdf", Duration::from_secs(600))
            .await
            .unwrap();
        assert!(url.starts_with("https://acct.r2.cloudflarestorage.com/resources/pdfs/1-abc-notes.pdf?"));
        assert!(url.contains("X-Amz-Expires=600"));
        assert!(url.contains("X-Amz-Signature="));
    }

    #[tokio::test]
    async fn oversized_expiry_is_a_configuration_error() {
        let store = R2ObjectStore::new(&config("https://acct.r2.cloudflarestorage.com")).unwrap();
        let err = store
            .presigned_download_url("k", Duration::from_secs(8 * 24 * 3600))
            .await
            .unwrap_err();
        assert!(matches!(err, ObjectStoreError::Configuration(_)));
    }

    #[test]
    fn public_url_uses_trimmed_base() {
        let store = R2ObjectStore::new(&config("https://acct.r2.cloudflarestorage.com")).unwrap();
        assert_eq!(store.public_url("a/b.pdf"), "https://cdn.example.com/a/b.pdf");
    }
}
