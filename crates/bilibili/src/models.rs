use serde::{Deserialize, Deserializer, Serialize};

use crate::BiliError;

/// Envelope shared by every `api.bilibili.com` JSON response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Check `code` and unwrap `data`.
    pub fn into_data(self, what: &'static str) -> Result<T, BiliError> {
        if self.code != 0 {
            return Err(BiliError::api(self.code, self.message));
        }
        self.data.ok_or(BiliError::MissingData(what))
    }
}

/// `null` and missing both deserialize to `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Owner {
    #[serde(default)]
    pub mid: u64,
    #[serde(default)]
    pub name: String,
}

/// Subset of `x/web-interface/view`; also the shape of watch-later entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    pub bvid: String,
    #[serde(default)]
    pub aid: u64,
    #[serde(default)]
    pub cid: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub owner: Owner,
}

/// One DASH track. Bilibili sends both camelCase and snake_case spellings of
/// the URL fields; only the camelCase ones are read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamItem {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub bandwidth: u64,
    pub base_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub backup_url: Vec<String>,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub codecs: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dash {
    #[serde(default, deserialize_with = "null_as_default")]
    pub video: Vec<StreamItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub audio: Vec<StreamItem>,
}

/// Subset of `x/player/wbi/playurl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoStream {
    #[serde(default)]
    pub result: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dash: Dash,
}

impl VideoStream {
    /// Status marker the player API uses when it had nothing to hand out.
    pub const NO_STREAMS_MARKER: &'static str = "suee";

    pub fn has_no_streams_marker(&self) -> bool {
        self.result == Self::NO_STREAMS_MARKER
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToViewList {
    #[serde(default)]
    pub count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub list: Vec<VideoInfo>,
}

/// One `result` group of the integrated search. Entries are kept raw since
/// their shape depends on `result_type`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResultGroup {
    pub result_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchAll {
    #[serde(default)]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: Vec<SearchResultGroup>,
}

#[derive(Deserialize)]
pub(crate) struct WbiImg {
    pub img_url: String,
    pub sub_url: String,
}

#[derive(Deserialize)]
pub(crate) struct NavData {
    pub wbi_img: WbiImg,
}
