//! The platform seen by the orchestrator and the batch drivers.

use acquire_engine::Gateway;
use async_trait::async_trait;
use bilibili_client::{BiliClient, StreamItem, VideoInfo, VideoSearchResult, VideoStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::Result;
use crate::media::{ContentMetadata, StreamListing, StreamVariant};

/// Remote catalogue operations. Every call may wait on the rate limiter and
/// returns a cancellation error when `token` fires first.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn resolve_metadata(&self, bvid: &str, token: &CancellationToken)
    -> Result<ContentMetadata>;

    async fn list_stream_variants(
        &self,
        bvid: &str,
        cid: u64,
        token: &CancellationToken,
    ) -> Result<StreamListing>;

    /// One page of video search hits, empty once the results run out.
    async fn search_videos(
        &self,
        keyword: &str,
        page: u32,
        token: &CancellationToken,
    ) -> Result<Vec<VideoSearchResult>>;

    /// The account's watch-later list.
    async fn watch_later(&self, token: &CancellationToken) -> Result<Vec<ContentMetadata>>;
}

/// [`PlatformClient`] backed by the Bilibili web API behind the shared gateway.
pub struct BilibiliPlatform {
    gateway: Gateway<BiliClient>,
}

impl BilibiliPlatform {
    pub fn new(gateway: Gateway<BiliClient>) -> Self {
        Self { gateway }
    }
}

impl From<VideoInfo> for ContentMetadata {
    fn from(info: VideoInfo) -> Self {
        Self {
            bvid: info.bvid,
            cid: info.cid,
            title: info.title,
            owner: info.owner.name,
        }
    }
}

impl From<StreamItem> for StreamVariant {
    fn from(item: StreamItem) -> Self {
        Self {
            mime_hint: item.mime_type,
            bandwidth: item.bandwidth,
            primary_url: item.base_url,
            backup_urls: item.backup_url,
        }
    }
}

impl From<VideoStream> for StreamListing {
    fn from(stream: VideoStream) -> Self {
        let no_streams_marker = stream.has_no_streams_marker();
        Self {
            video: stream.dash.video.into_iter().map(Into::into).collect(),
            audio: stream.dash.audio.into_iter().map(Into::into).collect(),
            no_streams_marker,
        }
    }
}

#[async_trait]
impl PlatformClient for BilibiliPlatform {
    async fn resolve_metadata(
        &self,
        bvid: &str,
        token: &CancellationToken,
    ) -> Result<ContentMetadata> {
        let client = self.gateway.acquire_access(token).await?;
        let info = client.video_info(bvid).await?;
        debug!(bvid, cid = info.cid, title = %info.title, "Resolved video info");
        Ok(info.into())
    }

    async fn list_stream_variants(
        &self,
        bvid: &str,
        cid: u64,
        token: &CancellationToken,
    ) -> Result<StreamListing> {
        let client = self.gateway.acquire_access(token).await?;
        let stream = client.video_stream(bvid, cid).await?;
        debug!(
            bvid,
            cid,
            video = stream.dash.video.len(),
            audio = stream.dash.audio.len(),
            result = %stream.result,
            "Fetched stream list"
        );
        Ok(stream.into())
    }

    async fn search_videos(
        &self,
        keyword: &str,
        page: u32,
        token: &CancellationToken,
    ) -> Result<Vec<VideoSearchResult>> {
        let client = self.gateway.acquire_access(token).await?;
        let results = client.search_all(keyword, page).await?;
        Ok(results.videos())
    }

    async fn watch_later(&self, token: &CancellationToken) -> Result<Vec<ContentMetadata>> {
        let client = self.gateway.acquire_access(token).await?;
        let list = client.to_view_list().await?;
        debug!(count = list.count, "Fetched watch-later list");
        Ok(list.list.into_iter().map(Into::into).collect())
    }
}
