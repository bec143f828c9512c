//! Events emitted by the UDP/TCP receive loops toward the dispatcher.

use std::net::SocketAddr;

use gb_sip_core::Message;

#[derive(Debug)]
pub enum TransportEvent {
    MessageReceived {
        message: Message,
        source: SocketAddr,
        destination: SocketAddr,
    },
    Error {
        error: String,
    },
    Closed,
}
