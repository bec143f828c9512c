//! Unified error type for the GB28181 gateway.
//!
//! Every crate in the workspace ultimately reports errors through this enum
//! so that a single `match` at the dispatcher or orchestrator boundary can
//! decide the right SIP status code (see spec §7: unknown methods -> 405,
//! missing/mismatched auth -> 401, media engine failures abort the session).

use std::net::SocketAddr;

/// Errors surfaced by the signaling core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("authentication failed")]
    AuthFailed,

    #[error("device offline")]
    DeviceOffline,

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("media engine failure: {0}")]
    MediaEngineFailure(String),

    #[error("no TCP connection registered for {0}")]
    NoTcpConnection(SocketAddr),

    #[error("transaction timed out")]
    TransactionTimeout,

    #[error("invalid message body: {0}")]
    InvalidBody(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps this error onto a SIP status code, for handlers that need to
    /// turn an internal failure into a wire response.
    pub fn sip_status(&self) -> (u16, &'static str) {
        match self {
            Error::AuthFailed => (401, "Unauthorized"),
            Error::ChannelNotFound(_) | Error::NotFound(_) => (404, "Not Found"),
            Error::InvalidBody(_) | Error::Parse(_) => (400, "Bad Request"),
            Error::DeviceOffline | Error::MediaEngineFailure(_) => (500, "Internal Server Error"),
            _ => (500, "Internal Server Error"),
        }
    }
}
