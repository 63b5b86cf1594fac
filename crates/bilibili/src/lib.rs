//! # Bilibili Client
//!
//! A small client for the parts of the Bilibili web API a video collector
//! needs: video metadata, DASH stream descriptors, integrated search, the
//! watch-later list and TV QR login. Requests that require a WBI signature
//! are signed transparently with keys cached per client.
//!
//! The client does no throttling of its own. Callers that care about the
//! platform's rate limits wrap it in their own gateway.

mod bvid;
mod client;
mod error;
mod html;
pub mod models;
pub mod qr_login;
mod search;
pub mod utils;
mod wbi;

pub use bvid::aid_to_bvid;
pub use client::{BASE_URL, BiliClient, DEFAULT_UA, Endpoints};
pub use error::BiliError;
pub use html::inner_text;
pub use models::{Dash, Owner, SearchAll, StreamItem, ToViewList, VideoInfo, VideoStream};
pub use qr_login::{QrGenerateResponse, QrPollResult, QrPollStatus};
pub use search::{VideoSearchResult, parse_duration};
pub use utils::generate_fake_buvid3;
pub use wbi::{WbiKeys, encode_wbi};
