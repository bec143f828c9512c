//! Gateway configuration: the `SIPListen`/`Region`/`MediaServer.*`/`NotifyMap`/
//! `GB28181` surface named in spec §6, loaded from TOML with environment
//! variable overrides.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// `host:port` shared by the UDP and TCP SIP listeners.
    pub sip_listen: String,
    /// Digest auth realm, also used as the `Region` reported to devices.
    pub region: String,
    pub media: MediaServerConfig,
    /// Event method name -> webhook URL.
    #[serde(default)]
    pub notify_map: HashMap<String, String>,
    pub gb28181: Gb28181Identity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaServerConfig {
    pub http: String,
    pub rtmp: String,
    pub rtsp: String,
    pub ws: String,
    pub restful: String,
    pub secret: String,
    pub rtp_ip: std::net::IpAddr,
    pub rtp_port: u16,
}

/// This server's own GB28181 device identity, embedded in outbound SDP/From
/// headers and reported in `devices.register` notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gb28181Identity {
    pub device_id: String,
    pub name: String,
}

impl GatewayConfig {
    /// Parses configuration from a TOML document, then applies a small set
    /// of `GB_*` environment variable overrides (mirroring how the original
    /// gateway layered env vars on top of its config file).
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: GatewayConfig =
            toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("GB_SIP_LISTEN") {
            self.sip_listen = v;
        }
        if let Ok(v) = std::env::var("GB_REGION") {
            self.region = v;
        }
        if let Ok(v) = std::env::var("GB_MEDIA_SECRET") {
            self.media.secret = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        sip_listen = "0.0.0.0:5060"
        region = "3402000000"

        [media]
        http = "http://127.0.0.1:8080"
        rtmp = "rtmp://127.0.0.1:1935"
        rtsp = "rtsp://127.0.0.1:554"
        ws = "ws://127.0.0.1:8080"
        restful = "http://127.0.0.1:8080"
        secret = "secret"
        rtp_ip = "127.0.0.1"
        rtp_port = 10000

        [gb28181]
        device_id = "34020000002000000001"
        name = "gateway"
    "#;

    #[test]
    fn parses_sample_config() {
        let cfg = GatewayConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.sip_listen, "0.0.0.0:5060");
        assert_eq!(cfg.region, "3402000000");
        assert_eq!(cfg.media.rtp_port, 10000);
    }
}
