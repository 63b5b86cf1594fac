mod common;

use common::{StubMerger, StubPlatform, StubTransfer, fixture, full_listing, variant};
use media_collector::Error;
use media_collector::history::{HistoryRecord, HistoryRepository};
use media_collector::media::{AcquisitionRequest, StreamListing};
use media_collector::orchestrator::{AcquireOptions, AcquisitionOutcome};
use tokio_util::sync::CancellationToken;

fn request(bvid: &str) -> AcquisitionRequest {
    AcquisitionRequest {
        bvid: bvid.to_string(),
        cid: Some(7),
        owner: "A".to_string(),
        title: "B".to_string(),
        keyword: "frog".to_string(),
        tags: vec!["x".to_string(), "y".to_string()],
        progress: Some("[1/1]".to_string()),
    }
}

#[tokio::test]
async fn ledger_hit_skips_all_network_work() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;
    f.history
        .record(&HistoryRecord {
            bvid: "BV1".to_string(),
            author: "A".to_string(),
            title: "B".to_string(),
            keyword: String::new(),
            tags: String::new(),
            file_name: "A - B.mp4".to_string(),
        })
        .await
        .unwrap();

    let outcome = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, AcquisitionOutcome::AlreadyAcquired);
    assert_eq!(f.platform.calls(), 0);
    assert!(f.transfer.urls().is_empty());
}

#[tokio::test]
async fn full_acquisition_merges_cleans_up_and_records() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;

    let outcome = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AcquisitionOutcome::Completed {
            file_name: "A - B.mp4".to_string()
        }
    );

    // Highest bandwidth video first, then audio.
    assert_eq!(f.transfer.urls(), ["http://cdn/v-high", "http://cdn/a"]);
    let merged = std::fs::read_to_string(f.dir.path().join("A - B.mp4")).unwrap();
    assert_eq!(merged, "http://cdn/v-highhttp://cdn/a");
    assert!(!f.dir.path().join("A - B_video.mp4").exists());
    assert!(!f.dir.path().join("A - B_audio.mp4").exists());

    let rows = f.history.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keyword, "frog");
    assert_eq!(rows[0].tags, "x;y");
    assert_eq!(rows[0].file_name, "A - B.mp4");
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;
    let token = CancellationToken::new();

    let first = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &token)
        .await
        .unwrap();
    assert!(first.is_completed());
    let calls = f.platform.calls();

    let second = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &token)
        .await
        .unwrap();
    assert_eq!(second, AcquisitionOutcome::AlreadyAcquired);
    assert_eq!(f.platform.calls(), calls);
    assert_eq!(f.history.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn force_reacquires_and_overwrites_the_row() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;
    let token = CancellationToken::new();
    f.downloader
        .acquire(request("BV1"), AcquireOptions::default(), &token)
        .await
        .unwrap();
    std::fs::remove_file(f.dir.path().join("A - B.mp4")).unwrap();

    let mut again = request("BV1");
    again.keyword = "toad".to_string();
    let outcome = f
        .downloader
        .acquire(
            again,
            AcquireOptions {
                force: true,
                save_history: true,
            },
            &token,
        )
        .await
        .unwrap();
    assert!(outcome.is_completed());

    let rows = f.history.list().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keyword, "toad");
}

#[tokio::test]
async fn no_streams_marker_is_a_benign_skip() {
    let f = fixture(
        StubPlatform::with_listing(StreamListing {
            video: Vec::new(),
            audio: vec![variant("http://cdn/a", "audio/mp4", 1)],
            no_streams_marker: true,
        }),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;

    let outcome = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, AcquisitionOutcome::Unavailable);
    assert!(f.transfer.urls().is_empty());
    assert_eq!(std::fs::read_dir(f.dir.path()).unwrap().count(), 0);
    assert!(f.history.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn empty_streams_without_marker_fail() {
    let f = fixture(
        StubPlatform::with_listing(StreamListing {
            video: vec![variant("http://cdn/v", "video/mp4", 1)],
            audio: Vec::new(),
            no_streams_marker: false,
        }),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;

    let err = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoStreams(ref bvid) if bvid == "BV1"));
    assert_eq!(err.to_string(), "can't get video stream, bvid: BV1");
}

#[tokio::test]
async fn merge_failure_keeps_tracks_and_skips_history() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger {
            fail: true,
            ..StubMerger::default()
        },
    )
    .await;

    let outcome = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    match outcome {
        AcquisitionOutcome::MergeFailed { file_name, reason } => {
            assert_eq!(file_name, "A - B.mp4");
            assert!(reason.contains("Invalid data"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    assert!(f.dir.path().join("A - B_video.mp4").exists());
    assert!(f.dir.path().join("A - B_audio.mp4").exists());
    assert!(f.history.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_cid_is_resolved_and_names_filled_in() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;

    let outcome = f
        .downloader
        .acquire(
            AcquisitionRequest::new("BV9"),
            AcquireOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AcquisitionOutcome::Completed {
            file_name: "A - B.mp4".to_string()
        }
    );
    // metadata + stream list
    assert_eq!(f.platform.calls(), 2);
}

#[tokio::test]
async fn track_failure_aborts_and_keeps_finished_sibling() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer {
            failing: vec!["http://cdn/a".to_string()],
            ..StubTransfer::default()
        },
        StubMerger::default(),
    )
    .await;

    let err = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Transfer(acquire_engine::TransferError::DownloadFailed { .. })
    ));
    // Single URL: five attempts.
    assert_eq!(
        f.transfer
            .urls()
            .iter()
            .filter(|u| *u == "http://cdn/a")
            .count(),
        5
    );
    assert!(f.dir.path().join("A - B_video.mp4").exists());
    assert!(!f.dir.path().join("A - B_audio.mp4").exists());
    assert_eq!(f.merger.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn existing_track_is_reused() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;
    std::fs::write(f.dir.path().join("A - B_video.mp4"), "earlier").unwrap();

    f.downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(f.transfer.urls(), ["http://cdn/a"]);
    let merged = std::fs::read_to_string(f.dir.path().join("A - B.mp4")).unwrap();
    assert_eq!(merged, "earlierhttp://cdn/a");
}

#[tokio::test]
async fn existing_output_skips_download() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;
    std::fs::write(f.dir.path().join("A - B.mp4"), "done").unwrap();

    let outcome = f
        .downloader
        .acquire(request("BV1"), AcquireOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        outcome,
        AcquisitionOutcome::OutputExists {
            file_name: "A - B.mp4".to_string()
        }
    );
    assert!(f.transfer.urls().is_empty());
}

#[tokio::test]
async fn no_history_option_leaves_ledger_untouched() {
    let f = fixture(
        StubPlatform::with_listing(full_listing()),
        StubTransfer::default(),
        StubMerger::default(),
    )
    .await;

    let outcome = f
        .downloader
        .acquire(
            request("BV1"),
            AcquireOptions {
                force: false,
                save_history: false,
            },
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert!(outcome.is_completed());
    assert!(!f.history.is_acquired("BV1").await.unwrap());
}
