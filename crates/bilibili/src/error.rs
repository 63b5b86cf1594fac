use thiserror::Error;

#[derive(Debug, Error)]
pub enum BiliError {
    #[error("http error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("api error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("missing data: {0}")]
    MissingData(&'static str),
    #[error("wbi signing failed: {0}")]
    Wbi(String),
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("login failed: {0}")]
    Login(String),
}

impl BiliError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }
}
