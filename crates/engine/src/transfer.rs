use std::path::Path;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use signoff_core::config::TransferConfig;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("server answered with status {status}")]
    Failed { status: u16 },
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("download cancelled")]
    Cancelled,
    #[error("download timed out")]
    TimedOut,
    #[error("file read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fetches attachment content over HTTP. One GET per call, no retries; the
/// caller decides whether a failed download is worth repeating. The token
/// lets a caller abandon a transfer that is no longer wanted, e.g. when the
/// preview it was fetched for has been closed.
pub struct AttachmentDownloader {
    client: reqwest::Client,
}

impl AttachmentDownloader {
    pub fn new(config: &TransferConfig) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(DownloadError::Network)?;
        Ok(Self { client })
    }

    pub async fn download(
        &self,
        url: &str,
        file_name: &str,
        cancel: &CancellationToken,
    ) -> Result<DownloadedFile, DownloadError> {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            sent = self.client.get(url).send() => sent.map_err(map_transport)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Failed { status: status.as_u16() });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
            body = response.bytes() => body.map_err(map_transport)?,
        };

        debug!(url, size = bytes.len(), "attachment downloaded");
        Ok(DownloadedFile {
            file_name: file_name.to_string(),
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    /// Reads an attachment that already lives on local disk, for preview.
    pub async fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>, DownloadError> {
        Ok(tokio::fs::read(path).await?)
    }
}

fn map_transport(err: reqwest::Error) -> DownloadError {
    if err.is_timeout() {
        DownloadError::TimedOut
    } else {
        DownloadError::Network(err)
    }
}
