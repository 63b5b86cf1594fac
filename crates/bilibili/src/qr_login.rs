//! QR code login through the TV endpoints, which hand back web cookies
//! directly once the code is confirmed in the mobile app.

use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::BiliError;
use crate::utils::{TV_APPKEY, TV_APPSEC, sign_params};

const QR_GENERATE_PATH: &str = "/x/passport-tv-login/qrcode/auth_code";
const QR_POLL_PATH: &str = "/x/passport-tv-login/qrcode/poll";

/// QR code generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrGenerateResponse {
    /// URL to encode as QR code
    pub url: String,
    /// Auth code for polling
    pub auth_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QrPollStatus {
    NotScanned,
    ScannedNotConfirmed,
    Expired,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrPollResult {
    pub status: QrPollStatus,
    pub message: String,
    /// Cookie string, set only on success
    pub cookies: Option<String>,
}

impl QrPollResult {
    fn pending(status: QrPollStatus, message: String) -> Self {
        Self {
            status,
            message,
            cookies: None,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CookieEntry {
    name: String,
    value: String,
}

#[derive(Deserialize)]
struct CookieInfo {
    #[serde(default)]
    cookies: Vec<CookieEntry>,
}

#[derive(Deserialize)]
struct PollData {
    cookie_info: Option<CookieInfo>,
}

fn signed_form(extra: Vec<(&'static str, String)>) -> Result<Vec<(&'static str, String)>, BiliError> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| BiliError::Login("system time before UNIX epoch".to_string()))?
        .as_secs()
        .to_string();

    let mut params = vec![
        ("appkey", TV_APPKEY.to_string()),
        ("local_id", "0".to_string()),
        ("ts", ts),
    ];
    params.extend(extra);
    let sign = sign_params(&mut params, TV_APPSEC);
    params.push(("sign", sign));
    Ok(params)
}

/// Ask for a new login QR code.
pub async fn generate_qr(
    client: &Client,
    passport_base: &str,
    user_agent: &str,
) -> Result<QrGenerateResponse, BiliError> {
    let params = signed_form(Vec::new())?;
    let body: Envelope = client
        .post(format!("{passport_base}{QR_GENERATE_PATH}"))
        .header(reqwest::header::USER_AGENT, user_agent)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    if body.code != 0 {
        return Err(BiliError::Login(format!(
            "QR generate failed: {} ({})",
            body.message, body.code
        )));
    }
    let data = body.data.ok_or(BiliError::MissingData("qr code"))?;
    Ok(serde_json::from_value(data)?)
}

/// Check whether the QR code identified by `auth_code` has been confirmed.
pub async fn poll_qr(
    client: &Client,
    passport_base: &str,
    user_agent: &str,
    auth_code: &str,
) -> Result<QrPollResult, BiliError> {
    let params = signed_form(vec![("auth_code", auth_code.to_string())])?;
    let body: Envelope = client
        .post(format!("{passport_base}{QR_POLL_PATH}"))
        .header(reqwest::header::USER_AGENT, user_agent)
        .form(&params)
        .send()
        .await?
        .json()
        .await?;

    debug!(code = body.code, message = %body.message, "QR poll");
    interpret_poll(body)
}

fn interpret_poll(body: Envelope) -> Result<QrPollResult, BiliError> {
    let message = body.message;
    match body.code {
        0 => {}
        86038 => return Ok(QrPollResult::pending(QrPollStatus::Expired, message)),
        86090 => {
            return Ok(QrPollResult::pending(
                QrPollStatus::ScannedNotConfirmed,
                message,
            ));
        }
        86039 => return Ok(QrPollResult::pending(QrPollStatus::NotScanned, message)),
        code => {
            return Err(BiliError::Login(format!("poll failed: {message} ({code})")));
        }
    }

    let data: PollData = match body.data {
        Some(d) if !d.is_null() => serde_json::from_value(d)?,
        _ => return Ok(QrPollResult::pending(QrPollStatus::NotScanned, message)),
    };

    let cookies = data
        .cookie_info
        .map(|info| {
            info.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; ")
        })
        .filter(|c| !c.is_empty());

    match cookies {
        Some(cookies) => Ok(QrPollResult {
            status: QrPollStatus::Success,
            message,
            cookies: Some(cookies),
        }),
        None => Ok(QrPollResult::pending(QrPollStatus::NotScanned, message)),
    }
}
