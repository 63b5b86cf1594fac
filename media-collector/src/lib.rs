//! media-collector library crate.
//!
//! Collects Bilibili videos: metadata lookup through a rate-limited gateway,
//! mirrored transfer of the best video and audio tracks, an ffmpeg merge and
//! a SQLite history ledger that keeps re-runs idempotent.

pub mod batch;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod media;
pub mod merge;
pub mod naming;
pub mod orchestrator;
pub mod platform;

pub use error::{Error, Result};
