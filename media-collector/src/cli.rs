use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser, Debug)]
#[command(name = "media-collector", version, about = "Collect Bilibili videos with history-based dedup")]
pub struct Args {
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in by scanning a QR code and store the cookies in the config file
    Login,
    /// Download videos
    Download {
        #[command(flatten)]
        overrides: DownloadOverrides,
        #[command(subcommand)]
        target: DownloadTarget,
    },
    /// Download history helpers
    History {
        #[command(subcommand)]
        cmd: HistoryCmd,
    },
}

/// Per-run overrides of config file values.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct DownloadOverrides {
    /// Output directory
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true)]
    pub ffmpeg: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum DownloadTarget {
    /// Download a single video by BVID/AID
    #[command(group(ArgGroup::new("id").required(true).args(["bvid", "aid"])))]
    Single {
        #[arg(long)]
        bvid: Option<String>,

        #[arg(long)]
        aid: Option<u64>,

        /// Download even when the history already lists the video
        #[arg(long)]
        force: bool,

        /// Do not record the download in the history
        #[arg(long)]
        no_history: bool,
    },
    /// Download the watch-later list
    ToView,
    /// Search and download videos
    Search {
        keyword: String,

        /// Number of videos to collect
        #[arg(short, long = "max-items", alias = "max", default_value_t = 200)]
        max_items: usize,

        /// Skip videos longer than this many minutes, 0 for no limit
        #[arg(long, default_value_t = 60)]
        max_minutes: u64,
    },
}

impl DownloadTarget {
    /// `None` when `max_minutes` is 0.
    pub fn max_duration(max_minutes: u64) -> Option<Duration> {
        (max_minutes > 0).then(|| Duration::from_secs(max_minutes * 60))
    }
}

#[derive(Subcommand, Debug)]
pub enum HistoryCmd {
    /// Write every history row to a JSON file
    Export { path: PathBuf },
}
