use std::path::Path;
use std::time::Duration;

use backoff::ExponentialBackoff;
use futures_util::StreamExt;
use reqwest::StatusCode;
use texcompile_lib::SourcePackage;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{config::SourceConfig, error::SourceError, filename, traits::Source};

/// HTTP client for the upstream source-retrieval service, with bounded
/// retries and backoff on transient errors.
pub struct SourceClient {
    http: reqwest::Client,
    config: SourceConfig,
}

impl SourceClient {
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| SourceError::RequestFailed(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.endpoint.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn request_with_retry(&self, url: &str, token: &str) -> Result<reqwest::Response, SourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            initial_interval: Duration::from_millis(500),
            ..Default::default()
        };
        let attempts = std::sync::atomic::AtomicU32::new(0);
        let max_retries = self.config.max_retries;
        backoff::future::retry(backoff, || async {
            if attempts.fetch_add(1, std::sync::atomic::Ordering::Relaxed) >= max_retries {
                return Err(backoff::Error::permanent(SourceError::RequestFailed(
                    "exhausted retries".to_string(),
                )));
            }
            let result = self
                .http
                .get(url)
                .header("Authorization", token)
                .send()
                .await;
            match result {
                Ok(resp) => classify_status(resp).map_err(to_backoff_error),
                Err(e) if e.is_connect() => {
                    Err(backoff::Error::transient(SourceError::ConnectionFailed(e.to_string())))
                }
                Err(e) if e.is_timeout() => {
                    Err(backoff::Error::transient(SourceError::ConnectionFailed(e.to_string())))
                }
                Err(e) if e.is_request() && e.to_string().to_lowercase().contains("tls") => {
                    Err(backoff::Error::permanent(SourceError::SecurityException(e.to_string())))
                }
                Err(e) => Err(backoff::Error::permanent(SourceError::RequestFailed(e.to_string()))),
            }
        })
        .await
    }

    /// Retrieves the sanitized/processed upload package, streaming the
    /// response body into a file under `save_to`.
    pub async fn get_source_content(
        &self,
        source_id: &str,
        token: &str,
        save_to: &Path,
    ) -> Result<SourcePackage, SourceError> {
        let url = self.url(&format!("{source_id}/content"));
        let response = self.request_with_retry(&url, token).await?;

        let content_disposition = response
            .headers()
            .get("content-disposition")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .trim_matches('"')
            .to_string();

        let filename = filename::derive_filename(content_disposition.as_deref(), source_id);
        let local_path = filename::safe_join(save_to, &filename)?;

        let mut file = tokio::fs::File::create(&local_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::RequestFailed(e.to_string()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("wrote source content to {}", local_path.display());
        Ok(SourcePackage {
            source_id: source_id.to_string(),
            local_path,
            etag,
        })
    }

    /// Probes `{endpoint}/status` with a short timeout and no retries,
    /// grounded on `filemanager.py::get_service_status`.
    pub async fn is_available(&self) -> bool {
        let url = self.url("status");
        self.http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|resp| resp.status().is_success())
            .unwrap_or(false)
    }

    /// Metadata-only request reporting the owner identity of an upload.
    /// The checksum is accepted for symmetry with the dispatch-layer
    /// signature but is not sent upstream; the upstream service identifies
    /// the owner purely from `source_id` and the caller's token.
    pub async fn owner(
        &self,
        source_id: &str,
        _checksum: &str,
        token: &str,
    ) -> Result<Option<String>, SourceError> {
        let url = self.url(&format!("{source_id}/content"));
        let response = self.request_with_retry(&url, token).await?;
        Ok(response
            .headers()
            .get("x-authenticated-owner")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()))
    }
}

#[async_trait::async_trait]
impl Source for SourceClient {
    async fn is_available(&self) -> bool {
        SourceClient::is_available(self).await
    }

    async fn get_source_content(
        &self,
        source_id: &str,
        token: &str,
        save_to: &Path,
    ) -> Result<SourcePackage, SourceError> {
        SourceClient::get_source_content(self, source_id, token, save_to).await
    }

    async fn owner(
        &self,
        source_id: &str,
        checksum: &str,
        token: &str,
    ) -> Result<Option<String>, SourceError> {
        SourceClient::owner(self, source_id, checksum, token).await
    }
}

fn classify_status(resp: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    match resp.status() {
        StatusCode::UNAUTHORIZED => Err(SourceError::RequestUnauthorized(resp.status().to_string())),
        StatusCode::FORBIDDEN => Err(SourceError::RequestForbidden(resp.status().to_string())),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(resp.status().to_string())),
        StatusCode::PAYLOAD_TOO_LARGE => Err(SourceError::Oversize(resp.status().to_string())),
        s if s.is_server_error() => Err(SourceError::RequestFailed(s.to_string())),
        _ => Ok(resp),
    }
}

fn to_backoff_error(e: SourceError) -> backoff::Error<SourceError> {
    match &e {
        SourceError::RequestFailed(_) => backoff::Error::transient(e),
        _ => backoff::Error::permanent(e),
    }
}
