//! Platform-neutral descriptions of what to acquire and where it can be fetched.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// One encoded track offered by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamVariant {
    /// Container hint such as `video/mp4`
    pub mime_hint: String,
    /// Ranking key, higher is better
    pub bandwidth: u64,
    pub primary_url: String,
    pub backup_urls: Vec<String>,
}

impl StreamVariant {
    /// Primary URL first, then the backups in order.
    pub fn candidate_urls(&self) -> Vec<String> {
        std::iter::once(self.primary_url.clone())
            .chain(self.backup_urls.iter().cloned())
            .filter(|u| !u.is_empty())
            .collect()
    }
}

/// Stream descriptors returned for one video part.
#[derive(Debug, Clone, Default)]
pub struct StreamListing {
    pub video: Vec<StreamVariant>,
    pub audio: Vec<StreamVariant>,
    /// The platform explicitly reported that it has nothing to hand out.
    pub no_streams_marker: bool,
}

/// Resolved identity of a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
    pub bvid: String,
    pub cid: u64,
    pub title: String,
    pub owner: String,
}

/// Everything the orchestrator needs to collect one video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub bvid: String,
    /// Resolved through a metadata lookup when absent
    pub cid: Option<u64>,
    pub owner: String,
    pub title: String,
    pub keyword: String,
    pub tags: Vec<String>,
    /// Shown in front of progress messages, e.g. `[3/20]`
    pub progress: Option<String>,
}

impl AcquisitionRequest {
    pub fn new(bvid: impl Into<String>) -> Self {
        Self {
            bvid: bvid.into(),
            ..Self::default()
        }
    }

    pub fn from_metadata(meta: ContentMetadata) -> Self {
        Self {
            bvid: meta.bvid,
            cid: Some(meta.cid).filter(|&cid| cid != 0),
            owner: meta.owner,
            title: meta.title,
            ..Self::default()
        }
    }
}

/// Order variants best first. Equal bandwidths keep their listed order.
pub fn rank_variants(variants: &mut [StreamVariant]) {
    variants.sort_by(|a, b| b.bandwidth.cmp(&a.bandwidth));
}

/// Highest-bandwidth variant; the first listed wins a tie.
pub fn select_best(variants: &mut [StreamVariant]) -> Option<&StreamVariant> {
    rank_variants(variants);
    variants.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(url: &str, bandwidth: u64) -> StreamVariant {
        StreamVariant {
            mime_hint: "video/mp4".to_string(),
            bandwidth,
            primary_url: url.to_string(),
            backup_urls: Vec::new(),
        }
    }

    #[test]
    fn best_variant_has_highest_bandwidth() {
        let mut variants = vec![variant("low", 100), variant("high", 900), variant("mid", 500)];
        assert_eq!(select_best(&mut variants).unwrap().primary_url, "high");
        let order: Vec<_> = variants.iter().map(|v| v.primary_url.as_str()).collect();
        assert_eq!(order, ["high", "mid", "low"]);
    }

    #[test]
    fn ties_keep_list_order() {
        let mut variants = vec![variant("first", 700), variant("second", 700), variant("x", 1)];
        assert_eq!(select_best(&mut variants).unwrap().primary_url, "first");
    }

    #[test]
    fn empty_list_has_no_best() {
        assert!(select_best(&mut []).is_none());
    }

    #[test]
    fn candidate_urls_put_primary_first() {
        let v = StreamVariant {
            backup_urls: vec!["b1".to_string(), "b2".to_string()],
            ..variant("p", 1)
        };
        assert_eq!(v.candidate_urls(), vec!["p", "b1", "b2"]);
    }
}
