//! The Stream (Session) entity spec §3 and §4.8 describe: a talk session's
//! full lifecycle state, published into the stream catalog as soon as the
//! SSRC is allocated and updated as the INVITE dialog progresses.

use gb_sip_core::Response;

use crate::channel::StreamType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Awaiting a final response to the outbound INVITE.
    Pending,
    /// ACKed, media flowing.
    Talking,
    /// BYE exchanged (or attempted), resources released.
    Stopped,
}

#[derive(Debug, Clone)]
pub struct Stream {
    pub stream_id: String,
    pub channel_id: String,
    pub device_id: String,
    pub ssrc: u32,
    pub session_type: u8,
    pub stream_type: StreamType,
    pub status: StreamStatus,
    pub stop: bool,
    pub call_id: Option<String>,
    pub cseq: Option<u32>,
    pub to_tag: Option<String>,
    pub from_tag: Option<String>,
    /// The INVITE's final response, kept only to build the eventual BYE —
    /// the stream does not own the transaction it arrived on.
    pub invite_response: Option<Response>,
    pub http_url: String,
    pub rtmp_url: String,
    pub rtsp_url: String,
    pub ws_flv_url: String,
    pub start: i64,
    pub end: i64,
    /// Unix timestamp after which an un-renewed stream is reaped.
    pub ext: i64,
    pub error: Option<String>,
}

impl Stream {
    pub fn new(stream_id: String, channel_id: String, device_id: String, ssrc: u32, session_type: u8) -> Self {
        Stream {
            stream_id,
            channel_id,
            device_id,
            ssrc,
            session_type,
            stream_type: StreamType::Push,
            status: StreamStatus::Pending,
            stop: false,
            call_id: None,
            cseq: None,
            to_tag: None,
            from_tag: None,
            invite_response: None,
            http_url: String::new(),
            rtmp_url: String::new(),
            rtsp_url: String::new(),
            ws_flv_url: String::new(),
            start: 0,
            end: 0,
            ext: 0,
            error: None,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        self.status != StreamStatus::Stopped && self.ext > 0 && now >= self.ext
    }
}
