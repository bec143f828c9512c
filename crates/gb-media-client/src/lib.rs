//! HTTP client against the media engine's `/index/api/*` control surface
//! (spec §4.10, component C10).

pub mod client;
pub mod types;

pub use client::MediaClient;
pub use types::{
    ApiResult, MediaListEntry, MediaListQuery, MediaListResponse, MediaTrack, OpenRtpServerRequest,
    OpenRtpServerResponse, RtpInfoResponse,
};
