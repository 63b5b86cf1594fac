use std::time::Duration;

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer cancelled")]
    Cancelled,

    #[error("file too large: {size} bytes (limit {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("no source URLs supplied")]
    EmptyUrlList,

    #[error("download {file} failed")]
    DownloadFailed { file: String },

    #[error("request failed with HTTP {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("no data received for {0:?}")]
    ReadTimeout(Duration),

    #[error("configuration error: {reason}")]
    Configuration { reason: String },
}

impl TransferError {
    pub fn download_failed(file: impl Into<String>) -> Self {
        Self::DownloadFailed { file: file.into() }
    }

    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub fn http_status(status: StatusCode, url: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            url: url.into(),
        }
    }

    /// Errors that no amount of retrying or mirror switching can fix.
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::FileTooLarge { .. } | Self::EmptyUrlList
        )
    }
}
