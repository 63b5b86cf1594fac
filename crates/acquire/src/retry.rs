// Retry/fallback policy for file transfers.
//
// Several URLs are independent mirrors: each is tried once, in order.
// A single URL is one failure domain: it is retried with a pause in between.

use std::path::Path;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::TransferError;
use crate::transfer::Transfer;

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts against a lone URL, counting the first one.
    pub max_attempts: u32,
    /// Pause between two attempts against the same URL.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Same attempt count, no pauses.
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Delay before the attempt following `attempt` (0-indexed).
    pub fn delay_after(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// Move the content behind `urls` into `destination`.
///
/// `FileTooLarge` and cancellation abort at once. When the whole policy is
/// exhausted the result is `DownloadFailed`. On any terminal failure the
/// partial destination file is removed so that a later run does not take it
/// for a finished track.
pub async fn transfer_with_fallback(
    engine: &dyn Transfer,
    destination: &Path,
    urls: &[String],
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    let result = drive(engine, destination, urls, policy, token).await;
    if result.is_err() {
        discard_partial(destination).await;
    }
    result
}

async fn drive(
    engine: &dyn Transfer,
    destination: &Path,
    urls: &[String],
    policy: &RetryPolicy,
    token: &CancellationToken,
) -> Result<(), TransferError> {
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match urls {
        [] => Err(TransferError::EmptyUrlList),
        [url] => {
            for attempt in 0..policy.max_attempts {
                match engine.transfer_once(destination, url, token).await {
                    Ok(bytes) => {
                        debug!(file = %file_name, bytes, attempt = attempt + 1, "Transfer succeeded");
                        return Ok(());
                    }
                    Err(e) if e.is_policy_violation() => return Err(e),
                    Err(e) => {
                        warn!(
                            file = %file_name,
                            attempt = attempt + 1,
                            max = policy.max_attempts,
                            error = %e,
                            "Download file failed, try again later"
                        );
                    }
                }

                if attempt + 1 < policy.max_attempts {
                    let delay = policy.delay_after(attempt);
                    tokio::select! {
                        _ = token.cancelled() => return Err(TransferError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
            error!(file = %file_name, "All attempts exhausted");
            Err(TransferError::download_failed(file_name))
        }
        mirrors => {
            for (index, url) in mirrors.iter().enumerate() {
                match engine.transfer_once(destination, url, token).await {
                    Ok(bytes) => {
                        debug!(file = %file_name, bytes, mirror = index, "Transfer succeeded");
                        return Ok(());
                    }
                    Err(e) if e.is_policy_violation() => return Err(e),
                    Err(e) => {
                        warn!(
                            file = %file_name,
                            mirror = index,
                            remaining = mirrors.len() - index - 1,
                            error = %e,
                            "Download file failed, try next URL"
                        );
                    }
                }
            }
            error!(file = %file_name, "All mirrors failed");
            Err(TransferError::download_failed(file_name))
        }
    }
}

async fn discard_partial(destination: &Path) {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => debug!(path = %destination.display(), "Removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %destination.display(), error = %e, "Failed to remove partial file"),
    }
}
