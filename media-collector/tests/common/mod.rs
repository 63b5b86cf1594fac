#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use acquire_engine::{RetryPolicy, Transfer, TransferError};
use async_trait::async_trait;
use bilibili_client::VideoSearchResult;
use media_collector::history::SqlxHistoryRepository;
use media_collector::media::{ContentMetadata, StreamListing, StreamVariant};
use media_collector::merge::Merger;
use media_collector::orchestrator::Downloader;
use media_collector::platform::PlatformClient;
use media_collector::{Error, Result};
use tokio_util::sync::CancellationToken;

pub fn variant(url: &str, mime: &str, bandwidth: u64) -> StreamVariant {
    StreamVariant {
        mime_hint: mime.to_string(),
        bandwidth,
        primary_url: url.to_string(),
        backup_urls: Vec::new(),
    }
}

pub fn full_listing() -> StreamListing {
    StreamListing {
        video: vec![
            variant("http://cdn/v-low", "video/mp4", 100),
            variant("http://cdn/v-high", "video/mp4", 900),
        ],
        audio: vec![variant("http://cdn/a", "audio/mp4", 64)],
        no_streams_marker: false,
    }
}

#[derive(Default)]
pub struct StubPlatform {
    pub calls: AtomicUsize,
    pub metadata: HashMap<String, ContentMetadata>,
    pub listing: StreamListing,
    pub search_pages: Vec<Vec<VideoSearchResult>>,
    pub watch_later: Vec<ContentMetadata>,
}

impl StubPlatform {
    pub fn with_listing(listing: StreamListing) -> Self {
        Self {
            listing,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformClient for StubPlatform {
    async fn resolve_metadata(
        &self,
        bvid: &str,
        _token: &CancellationToken,
    ) -> Result<ContentMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .metadata
            .get(bvid)
            .cloned()
            .unwrap_or_else(|| ContentMetadata {
                bvid: bvid.to_string(),
                cid: 7,
                title: "B".to_string(),
                owner: "A".to_string(),
            }))
    }

    async fn list_stream_variants(
        &self,
        _bvid: &str,
        _cid: u64,
        _token: &CancellationToken,
    ) -> Result<StreamListing> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listing.clone())
    }

    async fn search_videos(
        &self,
        _keyword: &str,
        page: u32,
        _token: &CancellationToken,
    ) -> Result<Vec<VideoSearchResult>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .search_pages
            .get(page as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn watch_later(&self, _token: &CancellationToken) -> Result<Vec<ContentMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.watch_later.clone())
    }
}

/// Writes the URL into the destination; URLs listed in `failing` error out.
#[derive(Default)]
pub struct StubTransfer {
    pub urls: Mutex<Vec<String>>,
    pub failing: Vec<String>,
}

impl StubTransfer {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transfer for StubTransfer {
    async fn transfer_once(
        &self,
        destination: &Path,
        url: &str,
        token: &CancellationToken,
    ) -> std::result::Result<u64, TransferError> {
        if token.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        self.urls.lock().unwrap().push(url.to_string());
        if self.failing.iter().any(|u| u == url) {
            return Err(TransferError::http_status(
                reqwest::StatusCode::SERVICE_UNAVAILABLE,
                url,
            ));
        }
        tokio::fs::write(destination, url).await?;
        Ok(url.len() as u64)
    }
}

/// Concatenates both inputs into the output, or fails when `fail` is set.
#[derive(Default)]
pub struct StubMerger {
    pub fail: bool,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Merger for StubMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Merge("exit status: 1: Invalid data".to_string()));
        }
        let mut data = tokio::fs::read(video).await?;
        data.extend(tokio::fs::read(audio).await?);
        tokio::fs::write(output, data).await?;
        Ok(())
    }
}

pub struct Fixture {
    pub platform: Arc<StubPlatform>,
    pub transfer: Arc<StubTransfer>,
    pub merger: Arc<StubMerger>,
    pub history: Arc<SqlxHistoryRepository>,
    pub downloader: Downloader,
    pub dir: tempfile::TempDir,
}

pub async fn fixture(platform: StubPlatform, transfer: StubTransfer, merger: StubMerger) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let platform = Arc::new(platform);
    let transfer = Arc::new(transfer);
    let merger = Arc::new(merger);
    let history = Arc::new(
        SqlxHistoryRepository::connect("sqlite::memory:")
            .await
            .unwrap(),
    );
    let downloader = Downloader::new(
        platform.clone(),
        transfer.clone(),
        merger.clone(),
        history.clone(),
        dir.path(),
    )
    .with_retry_policy(RetryPolicy::immediate());
    Fixture {
        platform,
        transfer,
        merger,
        history,
        downloader,
        dir,
    }
}

pub fn search_hit(bvid: &str, minutes: u64, is_pay: bool) -> VideoSearchResult {
    VideoSearchResult {
        bvid: bvid.to_string(),
        author: format!("owner-{bvid}"),
        title: format!("title-{bvid}"),
        tags: vec!["frog".to_string(), "nature".to_string()],
        duration: std::time::Duration::from_secs(minutes * 60),
        is_pay,
    }
}
