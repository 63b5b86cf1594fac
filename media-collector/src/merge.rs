//! Combines the downloaded video and audio tracks into one file.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use process_utils::{combined_output, tokio_command};
use tracing::debug;

use crate::{Error, Result};

#[async_trait]
pub trait Merger: Send + Sync {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Stream-copies both tracks into one container with ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegMerger {
    binary: PathBuf,
}

impl FfmpegMerger {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn build_args<'a>(video: &'a Path, audio: &'a Path, output: &'a Path) -> Vec<&'a OsStr> {
        vec![
            OsStr::new("-y"),
            OsStr::new("-i"),
            video.as_os_str(),
            OsStr::new("-i"),
            audio.as_os_str(),
            OsStr::new("-c:v"),
            OsStr::new("copy"),
            OsStr::new("-c:a"),
            OsStr::new("copy"),
            output.as_os_str(),
        ]
    }
}

#[async_trait]
impl Merger for FfmpegMerger {
    async fn merge(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        debug!(binary = %self.binary.display(), output = %output.display(), "Running ffmpeg");
        let result = tokio_command(&self.binary)
            .args(Self::build_args(video, audio, output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Merge(format!("failed to start {}: {e}", self.binary.display())))?;

        if result.status.success() {
            return Ok(());
        }

        Err(Error::Merge(format!(
            "{}: {}",
            result.status,
            combined_output(&result)
        )))
    }
}
