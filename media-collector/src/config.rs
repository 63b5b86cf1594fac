//! YAML configuration snapshot, read once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use acquire_engine::{ThrottleConfig, TransferConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Bilibili CDNs refuse media requests without this referer.
const MEDIA_REFERER: &str = "https://www.bilibili.com";

fn default_ffmpeg() -> String {
    if cfg!(windows) {
        "ffmpeg.exe".to_string()
    } else {
        "ffmpeg".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cookie string of the logged-in account
    pub cookies: String,
    /// Directory that receives merged files and temporary tracks
    pub output: PathBuf,
    /// ffmpeg executable, a path or a name looked up on `PATH`
    pub ffmpeg: String,
    /// SQLite file holding the download history
    pub history_db: String,
    /// Files whose declared size reaches this many bytes are refused, 0 disables
    pub max_file_size: u64,
    pub read_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_interval_ms: u64,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cookies: String::new(),
            output: PathBuf::from("./output"),
            ffmpeg: default_ffmpeg(),
            history_db: "./media-collector.db".to_string(),
            max_file_size: 1024 * 1024 * 1024,
            read_timeout_secs: 30,
            request_timeout_secs: 24 * 60 * 60,
            rate_limit_interval_ms: 1000,
            jitter_min_ms: 1000,
            jitter_max_ms: 3000,
        }
    }
}

impl AppConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                debug!(path = %path.display(), "Loaded config");
                Ok(serde_yaml::from_str(&raw)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let raw = serde_yaml::to_string(self)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    /// Fail fast when no login has been saved.
    pub fn require_cookies(&self) -> Result<&str> {
        if self.cookies.trim().is_empty() {
            return Err(Error::config("please login first"));
        }
        Ok(&self.cookies)
    }

    /// Resolve `ffmpeg` to an executable path.
    pub fn locate_ffmpeg(&self) -> Result<PathBuf> {
        which::which(&self.ffmpeg).map_err(|e| {
            Error::config(format!(
                "ffmpeg not found at {}, please install ffmpeg first: {e}",
                self.ffmpeg
            ))
        })
    }

    pub async fn prepare_output_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.output).await?;
        Ok(())
    }

    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.history_db.replace('\\', "/"))
    }

    pub fn transfer_config(&self) -> Result<TransferConfig> {
        TransferConfig::default()
            .with_max_file_size(self.max_file_size)
            .with_read_timeout(Duration::from_secs(self.read_timeout_secs))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_header("referer", MEDIA_REFERER)
            .map_err(Error::from)
    }

    pub fn throttle_config(&self) -> ThrottleConfig {
        let low = Duration::from_millis(self.jitter_min_ms);
        let high = Duration::from_millis(self.jitter_max_ms.max(self.jitter_min_ms));
        ThrottleConfig {
            interval: Duration::from_millis(self.rate_limit_interval_ms),
            jitter: low..=high,
        }
    }
}
