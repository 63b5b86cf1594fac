//! # Acquire Engine
//!
//! Building blocks for pulling large media files over unreliable links
//! without upsetting the service that hands out the links.
//!
//! ## Features
//!
//! - [`Gateway`]: token bucket plus randomized cooldown in front of an API client
//! - [`HttpTransfer`]: streamed GET into a file with a size cap and per-read timeout
//! - [`transfer_with_fallback`]: mirror fallback and single-URL retry on top of a [`Transfer`]
//!
//! Every waiting point honors a [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## License
//!
//! MIT License
//!

pub mod config;
pub mod error;
pub mod gateway;
pub mod progress;
pub mod retry;
pub mod transfer;

pub use config::{TransferConfig, create_client, install_rustls_provider};
pub use error::TransferError;
pub use gateway::{Gateway, RateLimiter, ThrottleConfig};
pub use progress::{ConsoleProgress, NoProgress, ProgressSink, TransferProgress};
pub use retry::{RetryPolicy, transfer_with_fallback};
pub use transfer::{HttpTransfer, Transfer};
