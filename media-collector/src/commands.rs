//! Command handlers behind the CLI.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use acquire_engine::{ConsoleProgress, Gateway, HttpTransfer, create_client};
use bilibili_client::{BiliClient, QrPollStatus, aid_to_bvid};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::batch::{SearchOptions, download_search, download_to_view};
use crate::cli::{Args, Commands, DownloadOverrides, DownloadTarget, HistoryCmd};
use crate::config::AppConfig;
use crate::history::{HistoryRepository, SqlxHistoryRepository};
use crate::media::AcquisitionRequest;
use crate::merge::FfmpegMerger;
use crate::orchestrator::{AcquireOptions, AcquisitionOutcome, Downloader};
use crate::platform::BilibiliPlatform;
use crate::{Error, Result};

/// API calls are small; only media transfers get the long timeout.
const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const QR_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run(args: Args, token: CancellationToken) -> Result<()> {
    let config = AppConfig::load(&args.config).await?;

    match args.command {
        Commands::Login => login(config, &args.config, &token).await,
        Commands::Download { overrides, target } => {
            let config = apply_overrides(config, &overrides);
            download(&config, target, &token).await
        }
        Commands::History {
            cmd: HistoryCmd::Export { path },
        } => export_history(&config, &path).await,
    }
}

fn apply_overrides(mut config: AppConfig, overrides: &DownloadOverrides) -> AppConfig {
    if let Some(output) = &overrides.output {
        config.output = output.clone();
    }
    if let Some(ffmpeg) = &overrides.ffmpeg {
        config.ffmpeg = ffmpeg.clone();
    }
    config
}

fn api_client(config: &AppConfig, cookies: &str) -> Result<BiliClient> {
    let http = create_client(
        &config
            .transfer_config()?
            .with_request_timeout(API_REQUEST_TIMEOUT),
    )?;
    Ok(BiliClient::new(http, cookies))
}

/// Validate the environment and wire up the production collaborators.
///
/// Missing cookies or a missing ffmpeg abort the run before any request.
pub async fn build_downloader(config: &AppConfig) -> Result<Downloader> {
    let cookies = config.require_cookies()?;
    let ffmpeg = config.locate_ffmpeg()?;
    config.prepare_output_dir().await?;
    let history = SqlxHistoryRepository::connect(&config.database_url()).await?;

    let transfer =
        HttpTransfer::new(config.transfer_config()?)?.with_progress(Arc::new(ConsoleProgress));
    let gateway = Gateway::new(api_client(config, cookies)?, config.throttle_config());

    Ok(Downloader::new(
        Arc::new(BilibiliPlatform::new(gateway)),
        Arc::new(transfer),
        Arc::new(FfmpegMerger::new(ffmpeg)),
        Arc::new(history),
        &config.output,
    ))
}

async fn download(
    config: &AppConfig,
    target: DownloadTarget,
    token: &CancellationToken,
) -> Result<()> {
    let downloader = build_downloader(config).await?;

    match target {
        DownloadTarget::Single {
            bvid,
            aid,
            force,
            no_history,
        } => {
            let bvid = match (bvid, aid) {
                (_, Some(aid)) if aid != 0 => aid_to_bvid(aid),
                (Some(bvid), _) if !bvid.trim().is_empty() => bvid.trim().to_string(),
                _ => return Err(Error::validation("bvid/aid is required")),
            };
            let options = AcquireOptions {
                force,
                save_history: !no_history,
            };
            let outcome = download_single(&downloader, &bvid, options, token).await?;
            report_single(&bvid, &outcome);
        }
        DownloadTarget::ToView => {
            let summary = download_to_view(&downloader, token).await?;
            info!(?summary, "Watch-later download finished");
        }
        DownloadTarget::Search {
            keyword,
            max_items,
            max_minutes,
        } => {
            let keyword = keyword.trim().to_string();
            if keyword.is_empty() {
                return Err(Error::validation("keyword is required"));
            }
            let options = SearchOptions {
                keyword,
                max_items,
                max_duration: DownloadTarget::max_duration(max_minutes),
            };
            let summary = download_search(&downloader, &options, token).await?;
            info!(keyword = %options.keyword, ?summary, "Search download finished");
        }
    }
    Ok(())
}

/// Acquire one video by id.
///
/// Unlike the batch commands, a merge failure is an error here so the
/// process exits non-zero. The track files stay on disk.
pub async fn download_single(
    downloader: &Downloader,
    bvid: &str,
    options: AcquireOptions,
    token: &CancellationToken,
) -> Result<AcquisitionOutcome> {
    let meta = downloader.platform().resolve_metadata(bvid, token).await?;
    match downloader
        .acquire(AcquisitionRequest::from_metadata(meta), options, token)
        .await?
    {
        AcquisitionOutcome::MergeFailed { file_name, reason } => {
            warn!(bvid, file = %file_name, "Tracks kept, merge did not succeed");
            Err(Error::Merge(reason))
        }
        outcome => Ok(outcome),
    }
}

fn report_single(bvid: &str, outcome: &AcquisitionOutcome) {
    match outcome {
        AcquisitionOutcome::Completed { file_name } => info!(bvid, file = %file_name, "Saved"),
        other => info!(bvid, ?other, "Nothing to download"),
    }
}

async fn login(mut config: AppConfig, config_path: &Path, token: &CancellationToken) -> Result<()> {
    let client = api_client(&config, "")?;
    let qr = client.generate_qr().await?;

    println!("Scan the QR code with the Bilibili app:\n{}", qr.url);

    loop {
        tokio::select! {
            _ = token.cancelled() => return Err(acquire_engine::TransferError::Cancelled.into()),
            _ = tokio::time::sleep(QR_POLL_INTERVAL) => {}
        }

        let result = client.poll_qr(&qr.auth_code).await?;
        match result.status {
            QrPollStatus::NotScanned => {}
            QrPollStatus::ScannedNotConfirmed => info!("Scanned, waiting for confirmation"),
            QrPollStatus::Expired => return Err(Error::validation("QR code expired, please retry")),
            QrPollStatus::Success => {
                let cookies = result
                    .cookies
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| Error::validation("login succeeded without cookies"))?;
                config.cookies = cookies;
                config.save(config_path).await?;
                info!(path = %config_path.display(), "Login succeeded, cookies saved");
                return Ok(());
            }
        }
    }
}

async fn export_history(config: &AppConfig, path: &Path) -> Result<()> {
    let history = SqlxHistoryRepository::connect(&config.database_url()).await?;
    let rows = history.list().await?;
    let json = serde_json::to_string_pretty(&rows)?;
    tokio::fs::write(path, json).await?;
    info!(rows = rows.len(), path = %path.display(), "History exported");
    Ok(())
}
