//! # Transfer Engine
//!
//! Streams one remote resource into one local file. The body is read into a
//! fixed-size buffer and every individual read is bounded by its own timeout,
//! so a stalled connection fails fast even though the overall request
//! timeout is very long.
//!
//! A failed attempt leaves whatever it wrote on disk. The next attempt opens
//! the destination with truncate-create, so bytes are never appended to a
//! previous partial file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, Url};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::{TransferConfig, create_client};
use crate::progress::{NoProgress, ProgressSink, TransferProgress};
use crate::TransferError;

/// One attempt at moving a URL's body into a file.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Returns the number of bytes written.
    async fn transfer_once(
        &self,
        destination: &Path,
        url: &str,
        token: &CancellationToken,
    ) -> Result<u64, TransferError>;
}

/// HTTP implementation of [`Transfer`].
pub struct HttpTransfer {
    client: Client,
    config: TransferConfig,
    progress: Arc<dyn ProgressSink>,
}

impl HttpTransfer {
    pub fn new(config: TransferConfig) -> Result<Self, TransferError> {
        let client = create_client(&config)?;
        Ok(Self {
            client,
            config,
            progress: Arc::new(NoProgress),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }
}

#[async_trait]
impl Transfer for HttpTransfer {
    #[instrument(skip(self, token), level = "debug")]
    async fn transfer_once(
        &self,
        destination: &Path,
        url: &str,
        token: &CancellationToken,
    ) -> Result<u64, TransferError> {
        let url = Url::parse(url)
            .map_err(|e| TransferError::configuration(format!("invalid URL {url}: {e}")))?;
        let file_name = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(destination)
            .await?;

        let response = tokio::select! {
            _ = token.cancelled() => return Err(TransferError::Cancelled),
            response = self.client.get(url.clone()).send() => response?,
        };

        if !response.status().is_success() {
            return Err(TransferError::http_status(response.status(), url.as_str()));
        }

        let declared = declared_size(response.headers());
        check_size_limit(declared, self.config.max_file_size)?;

        info!(name = %file_name, size = ?declared, "Downloading");
        let mut progress = self.progress.begin(&file_name, declared);

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let mut reader = StreamReader::new(Box::pin(body));

        let written = copy_chunks(
            &mut reader,
            &mut file,
            progress.as_mut(),
            self.config.buffer_size,
            self.config.read_timeout,
            token,
        )
        .await?;

        progress.finish();
        debug!(name = %file_name, bytes = written, "Transfer complete");
        Ok(written)
    }
}

/// Size declared by `Content-Length`, or `None` when missing or not a number.
pub fn declared_size(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Refuse content whose declared size meets or exceeds the cap. Unknown sizes pass.
pub fn check_size_limit(declared: Option<u64>, limit: Option<u64>) -> Result<(), TransferError> {
    match (declared, limit) {
        (Some(size), Some(limit)) if size >= limit => {
            Err(TransferError::FileTooLarge { size, limit })
        }
        _ => Ok(()),
    }
}

/// Copy `reader` into `writer` chunk by chunk until end of stream.
///
/// Each read races against `read_timeout` and the cancellation token.
pub async fn copy_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    progress: &mut dyn TransferProgress,
    buffer_size: usize,
    read_timeout: Duration,
    token: &CancellationToken,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; buffer_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = tokio::select! {
            _ = token.cancelled() => return Err(TransferError::Cancelled),
            read = tokio::time::timeout(read_timeout, reader.read(&mut buf)) => match read {
                Ok(result) => result?,
                Err(_) => return Err(TransferError::ReadTimeout(read_timeout)),
            },
        };

        if n == 0 {
            break;
        }

        writer.write_all(&buf[..n]).await?;
        progress.advance(n as u64);
        total += n as u64;
    }

    writer.flush().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    struct Counter(u64);

    impl TransferProgress for Counter {
        fn advance(&mut self, bytes: u64) {
            self.0 += bytes;
        }

        fn finish(&mut self) {}
    }

    #[test]
    fn content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_size(&headers), None);

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("1234"));
        assert_eq!(declared_size(&headers), Some(1234));

        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("lots"));
        assert_eq!(declared_size(&headers), None);
    }

    #[test]
    fn size_limit_is_inclusive() {
        assert!(check_size_limit(Some(99), Some(100)).is_ok());
        assert!(matches!(
            check_size_limit(Some(100), Some(100)),
            Err(TransferError::FileTooLarge {
                size: 100,
                limit: 100
            })
        ));
        assert!(check_size_limit(None, Some(100)).is_ok());
        assert!(check_size_limit(Some(u64::MAX), None).is_ok());
    }

    #[tokio::test]
    async fn copy_reports_every_chunk() {
        let data = vec![7u8; 10_000];
        let mut reader = data.as_slice();
        let mut out = Vec::new();
        let mut progress = Counter(0);
        let token = CancellationToken::new();

        let written = copy_chunks(
            &mut reader,
            &mut out,
            &mut progress,
            1024,
            Duration::from_secs(1),
            &token,
        )
        .await
        .unwrap();

        assert_eq!(written, 10_000);
        assert_eq!(progress.0, 10_000);
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn stalled_read_times_out() {
        // The write half stays open but silent, so reads never complete.
        let (_tx, mut rx) = tokio::io::duplex(64);
        let mut out = Vec::new();
        let token = CancellationToken::new();

        let result = copy_chunks(
            &mut rx,
            &mut out,
            &mut NoProgress,
            64,
            Duration::from_millis(30),
            &token,
        )
        .await;

        assert!(matches!(result, Err(TransferError::ReadTimeout(_))));
    }

    #[tokio::test]
    async fn cancelled_copy_stops() {
        let (_tx, mut rx) = tokio::io::duplex(64);
        let mut out = Vec::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = copy_chunks(
            &mut rx,
            &mut out,
            &mut NoProgress,
            64,
            Duration::from_secs(10),
            &token,
        )
        .await;

        assert!(matches!(result, Err(TransferError::Cancelled)));
    }
}
