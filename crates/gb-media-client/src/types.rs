//! Wire types for the `/index/api/*` surface, grounded on
//! `examples/original_source/sip/zlm.go`'s response structs.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize)]
pub struct OpenRtpServerRequest {
    pub stream_id: String,
    pub enable_tcp: bool,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenRtpServerResponse {
    pub code: i32,
    #[serde(default)]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RtpInfoResponse {
    pub code: i32,
    #[serde(default)]
    pub exist: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MediaListQuery {
    pub stream_id: Option<String>,
    pub app: Option<String>,
    pub schema: Option<String>,
    pub vhost: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaListResponse {
    pub code: i32,
    #[serde(default)]
    pub data: Vec<MediaListEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaListEntry {
    pub app: String,
    pub stream: String,
    pub schema: String,
    #[serde(rename = "originType")]
    pub origin_type: i32,
    #[serde(default)]
    pub tracks: Vec<MediaTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaTrack {
    #[serde(rename = "codec_type")]
    pub codec_type: i32,
    #[serde(rename = "codec_id")]
    pub codec_id: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub fps: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiResult {
    pub code: i32,
}
