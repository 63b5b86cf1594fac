use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use md5::{Digest, Md5};
use tokio::sync::Mutex;

use crate::BiliError;

const CACHE_EXPIRATION: Duration = Duration::from_secs(2 * 60 * 60); // 2 hours

const MIXIN_KEY_ENC_TAB: [usize; 64] = [
    46, 47, 18, 2, 53, 8, 23, 32, 15, 50, 10, 31, 58, 3, 45, 35, 27, 43, 5, 49, 33, 9, 42, 19, 29,
    28, 14, 39, 12, 38, 41, 13, 37, 48, 7, 16, 24, 55, 40, 61, 26, 17, 0, 1, 60, 51, 30, 4, 22, 25,
    54, 21, 56, 59, 6, 63, 57, 62, 11, 36, 20, 34, 44, 52,
];

#[derive(Clone, Debug)]
pub struct WbiKeys {
    img_key: String,
    sub_key: String,
    fetched_at: Instant,
}

impl WbiKeys {
    pub fn new(img_key: String, sub_key: String) -> Self {
        Self {
            img_key,
            sub_key,
            fetched_at: Instant::now(),
        }
    }

    /// Build keys from the `wbi_img` urls returned by the nav endpoint.
    pub fn from_urls(img_url: &str, sub_url: &str) -> Result<Self, BiliError> {
        let img_key = take_filename(img_url)
            .ok_or_else(|| BiliError::Wbi(format!("unexpected img_url {img_url}")))?;
        let sub_key = take_filename(sub_url)
            .ok_or_else(|| BiliError::Wbi(format!("unexpected sub_url {sub_url}")))?;
        Ok(Self::new(img_key, sub_key))
    }

    fn is_stale(&self) -> bool {
        self.fetched_at.elapsed() > CACHE_EXPIRATION
    }
}

/// Per-client cache of the WBI mixin keys.
#[derive(Debug, Default)]
pub struct WbiKeyCache {
    keys: Mutex<Option<WbiKeys>>,
}

impl WbiKeyCache {
    /// Return fresh cached keys, or fetch new ones with `fetch`.
    ///
    /// The lock is held during the fetch so concurrent callers share one
    /// refresh.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<WbiKeys, BiliError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<WbiKeys, BiliError>>,
    {
        let mut guard = self.keys.lock().await;
        if let Some(keys) = guard.as_ref().filter(|k| !k.is_stale()) {
            return Ok(keys.clone());
        }
        let keys = fetch().await?;
        *guard = Some(keys.clone());
        Ok(keys)
    }

    pub async fn invalidate(&self) {
        self.keys.lock().await.take();
    }
}

// Scramble img_key + sub_key into the mixin key
fn get_mixin_key(orig: &[u8]) -> String {
    MIXIN_KEY_ENC_TAB
        .iter()
        .take(32)
        .filter_map(|&i| orig.get(i).map(|&b| b as char))
        .collect::<String>()
}

fn get_url_encoded(s: &str) -> String {
    let mut encoded = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => {
                encoded.push(c);
            }
            // Dropped entirely, not encoded.
            '!' | '\'' | '(' | ')' | '*' => {}
            _ => {
                let mut buf = [0; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    encoded.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    encoded
}

/// Sign request parameters, returning the full query string with `wts` and `w_rid`.
pub fn encode_wbi(params: Vec<(&str, String)>, keys: &WbiKeys) -> Result<String, BiliError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| BiliError::Wbi("system time before UNIX epoch".to_string()))?
        .as_secs();
    Ok(encode_wbi_at(params, (&keys.img_key, &keys.sub_key), now))
}

fn encode_wbi_at(
    mut params: Vec<(&str, String)>,
    (img_key, sub_key): (&str, &str),
    timestamp: u64,
) -> String {
    let mixin_key = get_mixin_key((img_key.to_owned() + sub_key).as_bytes());
    params.push(("wts", timestamp.to_string()));
    params.sort_by(|a, b| a.0.cmp(b.0));
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", get_url_encoded(k), get_url_encoded(v)))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Md5::new();
    hasher.update(query.clone() + &mixin_key);
    let web_sign = format!("{:x}", hasher.finalize());
    query + &format!("&w_rid={web_sign}")
}

fn take_filename(url: &str) -> Option<String> {
    url.rsplit_once('/')
        .and_then(|(_, s)| s.rsplit_once('.'))
        .map(|(s, _)| s.to_string())
}
