use md5::{Digest, Md5};

/// BiliTV AppKey, used for TV QR login.
pub const TV_APPKEY: &str = "4409e2ce8ffd12b8";
/// BiliTV AppSec, paired with TV_APPKEY.
pub const TV_APPSEC: &str = "59b43e04ad6965f34319062b478f83dd";

/// Sign parameters with MD5 for Bilibili APP API requests.
///
/// 1. Sort params alphabetically by key
/// 2. Join as `key=value&...`
/// 3. Append `appsec`
/// 4. MD5 hex digest → `sign`
pub fn sign_params(params: &mut [(&str, String)], appsec: &str) -> String {
    params.sort_by(|a, b| a.0.cmp(b.0));
    let query: String = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Md5::new();
    hasher.update(format!("{query}{appsec}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Generates a fake BUVID3 identifier.
///
/// Format: `XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXXinfoc`, X being uppercase hex.
pub fn generate_fake_buvid3() -> String {
    let u_str = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    format!(
        "{}-{}-{}-{}-{}infoc",
        &u_str[0..8],
        &u_str[8..12],
        &u_str[12..16],
        &u_str[16..20],
        &u_str[20..]
    )
}

/// Extract a specific cookie value from a cookie string.
pub fn extract_cookie_value(cookies: &str, name: &str) -> Option<String> {
    cookies.split(';').find_map(|cookie| {
        let (key, value) = cookie.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Append a synthetic `buvid3` when the cookie string has none.
pub fn ensure_buvid3(cookies: &str) -> String {
    if extract_cookie_value(cookies, "buvid3").is_some() {
        return cookies.to_string();
    }
    let trimmed = cookies.trim().trim_end_matches(';');
    if trimmed.is_empty() {
        format!("buvid3={}", generate_fake_buvid3())
    } else {
        format!("{trimmed}; buvid3={}", generate_fake_buvid3())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_params() {
        let mut params = vec![
            ("ts", "1234567890".to_string()),
            ("appkey", TV_APPKEY.to_string()),
            ("local_id", "0".to_string()),
        ];
        let sign = sign_params(&mut params, TV_APPSEC);
        assert_eq!(params[0].0, "appkey");
        assert_eq!(sign.len(), 32);
        assert!(sign.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn buvid3_shape() {
        let id = generate_fake_buvid3();
        assert!(id.ends_with("infoc"));
        assert_eq!(id.len(), 32 + 4 + 5);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn test_extract_cookie_value() {
        let cookies = "SESSDATA=abc123; bili_jct=xyz789";
        assert_eq!(
            extract_cookie_value(cookies, "SESSDATA"),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_cookie_value(cookies, "bili_jct"),
            Some("xyz789".to_string())
        );
        assert_eq!(extract_cookie_value(cookies, "buvid3"), None);
    }

    #[test]
    fn buvid3_added_only_when_missing() {
        let with = "SESSDATA=a; buvid3=KEEP";
        assert_eq!(ensure_buvid3(with), with);

        let without = ensure_buvid3("SESSDATA=a;");
        assert!(without.starts_with("SESSDATA=a; buvid3="));

        assert!(ensure_buvid3("").starts_with("buvid3="));
    }
}
