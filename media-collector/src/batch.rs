//! Sequential batch drivers: integrated search and the watch-later list.
//!
//! One request finishes or fails before the next one starts. Per-item
//! failures are logged and counted; cancellation stops the whole batch.

use std::time::Duration;

use bilibili_client::VideoSearchResult;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;
use crate::media::AcquisitionRequest;
use crate::orchestrator::{AcquireOptions, AcquisitionOutcome, Downloader};

/// Parameters of a search-driven batch.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub keyword: String,
    /// Stop paginating once this many candidates were collected.
    pub max_items: usize,
    /// Longer videos are skipped; `None` disables the limit.
    pub max_duration: Option<Duration>,
}

/// Tally of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub completed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn count(&mut self, outcome: &Result<AcquisitionOutcome>) {
        match outcome {
            Ok(AcquisitionOutcome::Completed { .. }) => self.completed += 1,
            Ok(AcquisitionOutcome::MergeFailed { .. }) | Err(_) => self.failed += 1,
            Ok(_) => self.skipped += 1,
        }
    }
}

/// Page through the search results and keep what should be downloaded.
pub async fn collect_search_candidates(
    downloader: &Downloader,
    options: &SearchOptions,
    token: &CancellationToken,
) -> Result<Vec<VideoSearchResult>> {
    let mut candidates = Vec::new();
    let mut page = 1;

    while candidates.len() < options.max_items {
        let results = downloader
            .platform()
            .search_videos(&options.keyword, page, token)
            .await?;
        if results.is_empty() {
            info!(page, "Search returned no more videos");
            break;
        }
        info!(page, count = results.len(), "Search");

        for result in results {
            if result.is_pay {
                info!(bvid = %result.bvid, title = %result.title, "Skip paid video");
                continue;
            }
            if downloader.history().is_acquired(&result.bvid).await? {
                continue;
            }
            if let Some(limit) = options.max_duration
                && result.duration > limit
            {
                info!(
                    bvid = %result.bvid,
                    title = %result.title,
                    duration = ?result.duration,
                    "Skip long video"
                );
                continue;
            }
            candidates.push(result);
        }
        page += 1;
    }

    candidates.truncate(options.max_items);
    info!(results = candidates.len(), "Search completed");
    Ok(candidates)
}

/// Search, then download every candidate.
pub async fn download_search(
    downloader: &Downloader,
    options: &SearchOptions,
    token: &CancellationToken,
) -> Result<BatchSummary> {
    let candidates = collect_search_candidates(downloader, options, token).await?;
    let requests = candidates
        .into_iter()
        .map(|r| AcquisitionRequest {
            bvid: r.bvid,
            owner: r.author,
            title: r.title,
            keyword: options.keyword.clone(),
            tags: r.tags,
            ..AcquisitionRequest::default()
        })
        .collect();
    run_batch(downloader, requests, token).await
}

/// Download the account's watch-later list.
pub async fn download_to_view(
    downloader: &Downloader,
    token: &CancellationToken,
) -> Result<BatchSummary> {
    let entries = downloader.platform().watch_later(token).await?;
    info!(count = entries.len(), "Watch-later list fetched");
    let requests = entries
        .into_iter()
        .map(AcquisitionRequest::from_metadata)
        .collect();
    run_batch(downloader, requests, token).await
}

/// Acquire `requests` one after another, annotating each with `[i/n]`.
pub async fn run_batch(
    downloader: &Downloader,
    requests: Vec<AcquisitionRequest>,
    token: &CancellationToken,
) -> Result<BatchSummary> {
    let total = requests.len();
    let mut summary = BatchSummary::default();

    for (index, mut request) in requests.into_iter().enumerate() {
        let progress = format!("[{}/{}]", index + 1, total);
        request.progress = Some(progress.clone());
        let bvid = request.bvid.clone();

        match downloader
            .acquire(request, AcquireOptions::default(), token)
            .await
        {
            Err(e) if e.is_cancelled() => {
                info!(%progress, "Batch cancelled");
                return Err(e);
            }
            outcome => {
                if let Err(e) = &outcome {
                    error!(%progress, %bvid, error = %e, "Download failed");
                }
                summary.count(&outcome);
            }
        }
    }

    info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        "Batch finished"
    );
    Ok(summary)
}
