use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::BiliError;
use crate::html::inner_text;
use crate::models::SearchAll;

/// A video hit from the integrated search, cleaned up for downloading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoSearchResult {
    pub bvid: String,
    pub author: String,
    pub title: String,
    pub tags: Vec<String>,
    pub duration: Duration,
    pub is_pay: bool,
}

#[derive(Deserialize)]
struct RawVideoEntry {
    bvid: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    is_pay: i64,
}

impl VideoSearchResult {
    pub fn from_value(value: serde_json::Value) -> Result<Self, BiliError> {
        let raw: RawVideoEntry = serde_json::from_value(value)?;
        Ok(Self {
            duration: parse_duration(&raw.duration)?,
            bvid: raw.bvid,
            author: raw.author,
            title: inner_text(&raw.title),
            tags: raw
                .tag
                .split(',')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            is_pay: raw.is_pay != 0,
        })
    }
}

impl SearchAll {
    /// Video entries of this page, in the order returned. Entries that do
    /// not parse are logged and left out.
    pub fn videos(&self) -> Vec<VideoSearchResult> {
        self.result
            .iter()
            .filter(|group| group.result_type == "video")
            .flat_map(|group| group.data.iter().cloned())
            .filter_map(|entry| match VideoSearchResult::from_value(entry) {
                Ok(video) => Some(video),
                Err(e) => {
                    warn!(page = self.page, error = %e, "Skip malformed search entry");
                    None
                }
            })
            .collect()
    }
}

/// Parse `mm:ss` or `h:mm:ss`.
pub fn parse_duration(s: &str) -> Result<Duration, BiliError> {
    let invalid = || BiliError::InvalidDuration(s.to_string());
    let parts = s
        .trim()
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;

    let seconds = match parts.as_slice() {
        [m, sec] => m * 60 + sec,
        [h, m, sec] => h * 3600 + m * 60 + sec,
        _ => return Err(invalid()),
    };
    Ok(Duration::from_secs(seconds))
}
