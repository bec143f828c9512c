//! A minimal SDP session builder — just enough to construct the single
//! audio `m=` line an GB28181 talk/pull session needs (spec §4.8 step 6).
//! Not a general-purpose SDP parser/builder.

use std::net::IpAddr;

/// The handful of fields an outbound INVITE's SDP body needs.
#[derive(Debug, Clone)]
pub struct SdpSession {
    pub origin_username: String,
    pub connection_ip: IpAddr,
    pub session_name: String,
    pub media_port: u16,
    pub protocol: String,
    pub payload_type: u8,
    pub codec_name: String,
    pub clock_rate: u32,
    pub sendonly: bool,
    pub start: i64,
    pub end: i64,
    pub ssrc: u32,
}

impl SdpSession {
    /// Renders the SDP body exactly as spec §4.8 step 6 describes:
    /// `m=audio <port> TCP/RTP/AVP 8` with `sendonly`/`rtpmap` attributes and
    /// a single timing block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("v=0\r\n");
        out.push_str(&format!(
            "o={} 0 0 IN IP4 {}\r\n",
            self.origin_username, self.connection_ip
        ));
        out.push_str(&format!("s={}\r\n", self.session_name));
        out.push_str(&format!("c=IN IP4 {}\r\n", self.connection_ip));
        out.push_str(&format!("t={} {}\r\n", self.start, self.end));
        out.push_str(&format!(
            "m=audio {} {} {}\r\n",
            self.media_port, self.protocol, self.payload_type
        ));
        if self.sendonly {
            out.push_str("a=sendonly\r\n");
        }
        out.push_str(&format!(
            "a=rtpmap:{} {}/{}\r\n",
            self.payload_type, self.codec_name, self.clock_rate
        ));
        out.push_str(&format!("y={}\r\n", self.ssrc));
        out
    }
}
