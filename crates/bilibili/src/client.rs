use reqwest::{Client, RequestBuilder};
use reqwest::header::{COOKIE, REFERER, USER_AGENT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::BiliError;
use crate::models::{ApiResponse, NavData, SearchAll, ToViewList, VideoInfo, VideoStream};
use crate::qr_login::{self, QrGenerateResponse, QrPollResult};
use crate::utils::ensure_buvid3;
use crate::wbi::{WbiKeyCache, WbiKeys, encode_wbi};

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

/// Referer every API host and CDN expects.
pub const BASE_URL: &str = "https://www.bilibili.com";

/// Hosts the client talks to. Overridable for tests.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api: String,
    pub passport: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api: "https://api.bilibili.com".to_string(),
            passport: "https://passport.bilibili.com".to_string(),
        }
    }
}

/// Authenticated client for the handful of web APIs the collector needs.
#[derive(Debug)]
pub struct BiliClient {
    http: Client,
    endpoints: Endpoints,
    cookies: String,
    wbi: WbiKeyCache,
}

impl BiliClient {
    const VIEW_PATH: &'static str = "/x/web-interface/view";
    const PLAYURL_PATH: &'static str = "/x/player/wbi/playurl";
    const SEARCH_ALL_PATH: &'static str = "/x/web-interface/wbi/search/all/v2";
    const TO_VIEW_PATH: &'static str = "/x/v2/history/toview";
    const NAV_PATH: &'static str = "/x/web-interface/nav";

    /// DASH only.
    const FNVAL_DASH: &'static str = "16";

    pub fn new(http: Client, cookies: &str) -> Self {
        Self {
            http,
            endpoints: Endpoints::default(),
            cookies: ensure_buvid3(cookies),
            wbi: WbiKeyCache::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Cookie string sent with every request, including the synthetic `buvid3`.
    pub fn cookies(&self) -> &str {
        &self.cookies
    }

    fn get(&self, url: &str) -> RequestBuilder {
        debug!(url, "GET");
        self.http.get(url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BiliError> {
        let response = request
            .header(USER_AGENT, DEFAULT_UA)
            .header(REFERER, BASE_URL)
            .header(COOKIE, &self.cookies)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    async fn get_api<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<ApiResponse<T>, BiliError> {
        let request = self
            .get(&format!("{}{path}", self.endpoints.api))
            .query(params);
        self.send_json(request).await
    }

    async fn get_wbi_api<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> Result<ApiResponse<T>, BiliError> {
        let keys = self.wbi_keys().await?;
        let query = encode_wbi(params, &keys)?;
        let response: ApiResponse<T> = self
            .send_json(self.get(&format!("{}{path}?{query}", self.endpoints.api)))
            .await?;
        // -352 means the signature was rejected, usually because the keys rotated.
        if response.code == -352 {
            self.wbi.invalidate().await;
        }
        Ok(response)
    }

    async fn wbi_keys(&self) -> Result<WbiKeys, BiliError> {
        self.wbi
            .get_or_refresh(|| async {
                // The nav endpoint answers -101 for anonymous sessions but
                // still carries the keys, so `code` is not checked here.
                let nav: ApiResponse<NavData> = self
                    .send_json(self.get(&format!("{}{}", self.endpoints.api, Self::NAV_PATH)))
                    .await?;
                let data = nav.data.ok_or(BiliError::MissingData("wbi keys"))?;
                WbiKeys::from_urls(&data.wbi_img.img_url, &data.wbi_img.sub_url)
            })
            .await
    }

    /// Basic metadata of a video.
    pub async fn video_info(&self, bvid: &str) -> Result<VideoInfo, BiliError> {
        self.get_api::<VideoInfo>(Self::VIEW_PATH, &[("bvid", bvid.to_string())])
            .await?
            .into_data("video info")
    }

    /// DASH stream descriptors for one part of a video.
    pub async fn video_stream(&self, bvid: &str, cid: u64) -> Result<VideoStream, BiliError> {
        self.get_wbi_api::<VideoStream>(
            Self::PLAYURL_PATH,
            vec![
                ("bvid", bvid.to_string()),
                ("cid", cid.to_string()),
                ("fnval", Self::FNVAL_DASH.to_string()),
                ("platform", "pc".to_string()),
            ],
        )
        .await?
        .into_data("video stream")
    }

    /// One page of the integrated search.
    pub async fn search_all(&self, keyword: &str, page: u32) -> Result<SearchAll, BiliError> {
        self.get_wbi_api::<SearchAll>(
            Self::SEARCH_ALL_PATH,
            vec![("keyword", keyword.to_string()), ("page", page.to_string())],
        )
        .await?
        .into_data("search result")
    }

    /// The account's watch-later list.
    pub async fn to_view_list(&self) -> Result<ToViewList, BiliError> {
        self.get_api::<ToViewList>(Self::TO_VIEW_PATH, &[])
            .await?
            .into_data("to-view list")
    }

    pub async fn generate_qr(&self) -> Result<QrGenerateResponse, BiliError> {
        qr_login::generate_qr(&self.http, &self.endpoints.passport, DEFAULT_UA).await
    }

    pub async fn poll_qr(&self, auth_code: &str) -> Result<QrPollResult, BiliError> {
        qr_login::poll_qr(&self.http, &self.endpoints.passport, DEFAULT_UA, auth_code).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_are_percent_encoded() {
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
        let client = BiliClient::new(Client::new(), "SESSDATA=x");
        let request = client
            .get("https://api.example.com/x/web-interface/view")
            .query(&[("bvid", "BV1y7411Q7Eq"), ("keyword", "a b&c")])
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("bvid=BV1y7411Q7Eq&keyword=a+b%26c"));
    }
}
