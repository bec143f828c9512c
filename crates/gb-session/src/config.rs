//! Static configuration the orchestrator needs beyond what it discovers at
//! runtime (device/channel lookups, media-engine responses).

use std::net::IpAddr;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// This gateway's own GB28181 device-id, used as the SDP origin
    /// username and the INVITE `From`.
    pub server_device_id: String,
    pub server_host: String,
    pub server_port: u16,
    pub media_rtp_ip: IpAddr,
    pub media_rtp_port: u16,
    pub media_http_base: String,
    pub media_rtmp_base: String,
    pub media_rtsp_base: String,
    pub media_ws_base: String,
    /// How long a published stream lingers without renewal before the
    /// reaper tears it down (spec §4.8: "Ext = now + 120 s").
    pub stream_ttl_secs: i64,
    /// Whether a torn-down stream is removed from the catalog outright, or
    /// kept with `status = Stopped` for audit (spec §9 Open Question a:
    /// the source's own deletion call is commented out, left as an
    /// implementation choice rather than resolved one way).
    pub evict_streams_on_bye: bool,
}
