//! Acquisition of one video: lookup, stream selection, both track
//! transfers, merge and bookkeeping.
//!
//! ```text
//! LOOKUP -> STREAM_SELECT -> TRANSFER_VIDEO -> TRANSFER_AUDIO -> MERGE -> FINALIZE
//! ```
//!
//! Requests already in the ledger stop before any network work unless
//! `force` is set. A merge failure ends the request without an error so a
//! batch keeps going; the track files stay on disk for inspection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use acquire_engine::{RetryPolicy, Transfer, transfer_with_fallback};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::history::{HistoryRecord, HistoryRepository, TAG_SEPARATOR};
use crate::media::{AcquisitionRequest, StreamKind, StreamVariant, select_best};
use crate::merge::Merger;
use crate::naming::output_file_name;
use crate::platform::PlatformClient;
use crate::{Error, Result};

/// Container of the merged output.
const MERGED_FORMAT: &str = "mp4";

/// Per-call switches for [`Downloader::acquire`].
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    /// Ignore the ledger and download again.
    pub force: bool,
    /// Write a ledger row once the merged file is in place.
    pub save_history: bool,
}

impl Default for AcquireOptions {
    fn default() -> Self {
        Self {
            force: false,
            save_history: true,
        }
    }
}

/// How a request ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionOutcome {
    /// The ledger already lists the video.
    AlreadyAcquired,
    /// The platform reported that it has no streams for this video.
    Unavailable,
    /// The merged file is already on disk.
    OutputExists { file_name: String },
    /// ffmpeg failed; both track files were left in place.
    MergeFailed { file_name: String, reason: String },
    Completed { file_name: String },
}

impl AcquisitionOutcome {
    /// A new file was produced.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Drives [`AcquisitionRequest`]s one at a time.
pub struct Downloader {
    platform: Arc<dyn PlatformClient>,
    transfer: Arc<dyn Transfer>,
    merger: Arc<dyn Merger>,
    history: Arc<dyn HistoryRepository>,
    output_dir: PathBuf,
    retry: RetryPolicy,
}

impl Downloader {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        transfer: Arc<dyn Transfer>,
        merger: Arc<dyn Merger>,
        history: Arc<dyn HistoryRepository>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            platform,
            transfer,
            merger,
            history,
            output_dir: output_dir.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn platform(&self) -> &dyn PlatformClient {
        self.platform.as_ref()
    }

    pub fn history(&self) -> &dyn HistoryRepository {
        self.history.as_ref()
    }

    /// Run one request to a terminal state.
    pub async fn acquire(
        &self,
        mut request: AcquisitionRequest,
        options: AcquireOptions,
        token: &CancellationToken,
    ) -> Result<AcquisitionOutcome> {
        if request.bvid.is_empty() {
            return Err(Error::validation("bvid is required"));
        }

        if !options.force && self.history.is_acquired(&request.bvid).await? {
            info!(
                bvid = %request.bvid,
                owner = %request.owner,
                title = %request.title,
                "Already downloaded"
            );
            return Ok(AcquisitionOutcome::AlreadyAcquired);
        }

        // LOOKUP
        let cid = match request.cid {
            Some(cid) if !request.owner.is_empty() && !request.title.is_empty() => cid,
            known => {
                let meta = self.platform.resolve_metadata(&request.bvid, token).await?;
                if request.owner.is_empty() {
                    request.owner = meta.owner;
                }
                if request.title.is_empty() {
                    request.title = meta.title;
                }
                known.unwrap_or(meta.cid)
            }
        };

        // STREAM_SELECT
        let mut listing = self
            .platform
            .list_stream_variants(&request.bvid, cid, token)
            .await?;
        if listing.video.is_empty() || listing.audio.is_empty() {
            if listing.no_streams_marker {
                info!(bvid = %request.bvid, "No available streams");
                return Ok(AcquisitionOutcome::Unavailable);
            }
            return Err(Error::NoStreams(request.bvid));
        }

        let file_name = output_file_name(&request.owner, &request.title, None, MERGED_FORMAT);
        let output_path = self.output_dir.join(&file_name);
        if tokio::fs::try_exists(&output_path).await? {
            info!(file = %file_name, "Skip download, output exists");
            return Ok(AcquisitionOutcome::OutputExists { file_name });
        }

        let (Some(video), Some(audio)) = (
            select_best(&mut listing.video).cloned(),
            select_best(&mut listing.audio).cloned(),
        ) else {
            return Err(Error::NoStreams(request.bvid));
        };

        // TRANSFER_VIDEO / TRANSFER_AUDIO
        let video_path = self
            .fetch_track(&request, StreamKind::Video, &video, token)
            .await?;
        let audio_path = self
            .fetch_track(&request, StreamKind::Audio, &audio, token)
            .await?;

        // MERGE
        match &request.progress {
            Some(progress) => info!("{progress} Merging {file_name}"),
            None => info!("Merging {file_name}"),
        }
        if let Err(e) = self.merger.merge(&video_path, &audio_path, &output_path).await {
            error!(file = %file_name, error = %e, "Merge failed");
            return Ok(AcquisitionOutcome::MergeFailed {
                file_name,
                reason: e.to_string(),
            });
        }

        // FINALIZE
        remove_track(&video_path).await;
        remove_track(&audio_path).await;

        if options.save_history {
            self.history
                .record(&HistoryRecord {
                    bvid: request.bvid.clone(),
                    author: request.owner.clone(),
                    title: request.title.clone(),
                    keyword: request.keyword.clone(),
                    tags: request.tags.join(TAG_SEPARATOR),
                    file_name: file_name.clone(),
                })
                .await?;
        }

        info!(bvid = %request.bvid, file = %file_name, "Download completed");
        Ok(AcquisitionOutcome::Completed { file_name })
    }

    /// Download one track unless an earlier run already left it behind.
    async fn fetch_track(
        &self,
        request: &AcquisitionRequest,
        kind: StreamKind,
        variant: &StreamVariant,
        token: &CancellationToken,
    ) -> Result<PathBuf> {
        let name = output_file_name(&request.owner, &request.title, Some(kind), &variant.mime_hint);
        let path = self.output_dir.join(&name);
        if tokio::fs::try_exists(&path).await? {
            debug!(file = %name, "Reusing existing track");
            return Ok(path);
        }

        debug!(
            bvid = %request.bvid,
            kind = kind.label(),
            bandwidth = variant.bandwidth,
            file = %name,
            "Downloading track"
        );
        transfer_with_fallback(
            self.transfer.as_ref(),
            &path,
            &variant.candidate_urls(),
            &self.retry,
            token,
        )
        .await?;
        Ok(path)
    }
}

async fn remove_track(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove track file");
    }
}
