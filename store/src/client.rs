use std::time::Duration;

use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use md5::{Digest, Md5};
use texcompile_lib::{Format, Product, Task};
use tracing::{debug, error};

use crate::{config::StoreConfig, error::StoreError, keys, traits::Store};

/// S3-compatible object store gateway: key-addressed storage of status
/// records, artifacts, and logs, plus bucket initialization.
#[derive(Clone)]
pub struct ObjectStore {
    client: Client,
    bucket: String,
}

fn content_md5(body: &[u8]) -> String {
    STANDARD.encode(Md5::digest(body))
}

impl ObjectStore {
    pub async fn connect(config: StoreConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "texcompile-store",
            ));
        }
        let shared_config = loader.load().await;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            s3_builder = s3_builder.endpoint_url(endpoint).force_path_style(true);
        }
        let client = Client::from_conf(s3_builder.build());
        Self {
            client,
            bucket: config.bucket,
        }
    }

    /// Creates the bucket if absent and retries until a probe PUT succeeds.
    /// Idempotent.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        match self.client.create_bucket().bucket(&self.bucket).send().await {
            Ok(_) => debug!("created bucket {}", self.bucket),
            Err(e) => debug!("create_bucket {} returned (possibly already exists): {e}", self.bucket),
        }

        let backoff = backoff::ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };
        backoff::future::retry(backoff, || async {
            self.is_available()
                .await
                .then_some(())
                .ok_or(())
                .map_err(|_| backoff::Error::transient(StoreError::Unavailable(self.bucket.clone())))
        })
        .await
        .map_err(|_| StoreError::Unavailable(self.bucket.clone()))
    }

    /// A tiny PUT under a reserved key with short timeout and no retries.
    pub async fn is_available(&self) -> bool {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(keys::PROBE_KEY)
            .body(ByteStream::from_static(b"ok"))
            .send()
            .await
            .is_ok()
    }

    pub async fn get_status(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Task, StoreError> {
        let key = keys::status_key(source_id, checksum, output_format);
        let body = self.get_object(&key).await?;
        serde_json::from_slice(&body).map_err(|e| StoreError::RequestFailed(e.to_string()))
    }

    pub async fn set_status(&self, task: &Task) -> Result<(), StoreError> {
        let key = keys::status_key(&task.source_id, &task.checksum, task.output_format);
        let body =
            serde_json::to_vec(task).map_err(|e| StoreError::RequestFailed(e.to_string()))?;
        self.put_object(&key, body, "application/json").await
    }

    pub async fn store(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        artifact: Vec<u8>,
    ) -> Result<(), StoreError> {
        let key = keys::artifact_key(source_id, checksum, output_format);
        self.put_object(&key, artifact, output_format.content_type())
            .await
    }

    pub async fn retrieve(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        let key = keys::artifact_key(source_id, checksum, output_format);
        self.get_product(&key).await
    }

    pub async fn store_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        log: Vec<u8>,
    ) -> Result<(), StoreError> {
        let key = keys::log_key(source_id, checksum, output_format);
        self.put_object(&key, log, "text/plain").await
    }

    pub async fn retrieve_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        let key = keys::log_key(source_id, checksum, output_format);
        self.get_product(&key).await
    }

    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let md5 = content_md5(&body);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_md5(md5)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                error!("put_object {key} failed: {e}");
                StoreError::RequestFailed(e.to_string())
            })?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    StoreError::DoesNotExist(key.to_string())
                } else {
                    StoreError::RequestFailed(e.to_string())
                }
            })?;
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn get_product(&self, key: &str) -> Result<Product, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    StoreError::DoesNotExist(key.to_string())
                } else {
                    StoreError::RequestFailed(e.to_string())
                }
            })?;
        let etag = output.e_tag().map(|s| s.trim_matches('"').to_string());
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StoreError::RequestFailed(e.to_string()))?
            .into_bytes();
        Ok(Product {
            stream: bytes.to_vec(),
            etag,
        })
    }
}

#[async_trait::async_trait]
impl Store for ObjectStore {
    async fn is_available(&self) -> bool {
        ObjectStore::is_available(self).await
    }

    async fn get_status(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Task, StoreError> {
        ObjectStore::get_status(self, source_id, checksum, output_format).await
    }

    async fn set_status(&self, task: &Task) -> Result<(), StoreError> {
        ObjectStore::set_status(self, task).await
    }

    async fn store(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        artifact: Vec<u8>,
    ) -> Result<(), StoreError> {
        ObjectStore::store(self, source_id, checksum, output_format, artifact).await
    }

    async fn retrieve(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        ObjectStore::retrieve(self, source_id, checksum, output_format).await
    }

    async fn store_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
        log: Vec<u8>,
    ) -> Result<(), StoreError> {
        ObjectStore::store_log(self, source_id, checksum, output_format, log).await
    }

    async fn retrieve_log(
        &self,
        source_id: &str,
        checksum: &str,
        output_format: Format,
    ) -> Result<Product, StoreError> {
        ObjectStore::retrieve_log(self, source_id, checksum, output_format).await
    }
}

fn is_not_found<E>(err: &aws_sdk_s3::error::SdkError<E>) -> bool
where
    E: std::fmt::Debug,
{
    matches!(
        err,
        aws_sdk_s3::error::SdkError::ServiceError(service_err)
            if format!("{service_err:?}").contains("NoSuchKey")
    )
}
