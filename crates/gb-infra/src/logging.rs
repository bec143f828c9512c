//! Logging setup and the SIP wire-message tracing helpers.
//!
//! The original gateway this core is modeled on logs every inbound/outbound
//! SIP message at trace level with a boxed, human-readable dump so operators
//! can follow a dialog end to end. We keep that behavior but express it as a
//! `tracing` event with structured fields rather than hand-rolled ANSI boxes.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Configuration for the logging subsystem.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            json: false,
        }
    }
}

/// Installs the global tracing subscriber. Call once at process startup.
pub fn init(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Logs an inbound SIP request at trace level, matching the wire-dump
/// convention used throughout the dispatcher and handlers.
pub fn log_sip_request(source: std::net::SocketAddr, method: &str, tx_key: &str, raw: &str) {
    tracing::trace!(%source, method, tx_key, message = raw, "received SIP request");
}

/// Logs an inbound SIP response at trace level.
pub fn log_sip_response(source: std::net::SocketAddr, tx_key: &str, raw: &str) {
    tracing::trace!(%source, tx_key, message = raw, "received SIP response");
}

/// Logs an outbound SIP message at trace level.
pub fn log_sip_send(kind: &str, destination: std::net::SocketAddr, tx_key: &str, raw: &str) {
    tracing::trace!(kind, %destination, tx_key, message = raw, "sending SIP message");
}
