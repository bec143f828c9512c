//! Dual-transport SIP wire I/O: UDP and TCP sockets sharing a common
//! [`Transport`] trait and [`TransportEvent`] stream, so the dispatcher above
//! this crate never needs to know which one delivered a message.

pub mod events;
pub mod framing;
pub mod tcp;
pub mod transport;
pub mod udp;

pub use events::TransportEvent;
pub use framing::extract_message;
pub use tcp::{NewConnectionEvents, TcpTransport};
pub use transport::Transport;
pub use udp::UdpTransport;

use std::net::SocketAddr;

use gb_infra::Result;
use tokio::sync::mpsc;

/// Binds the UDP half of the signaling socket pair.
pub async fn bind_udp(addr: SocketAddr) -> Result<(UdpTransport, mpsc::Receiver<TransportEvent>)> {
    UdpTransport::bind(addr).await
}

/// Binds the TCP half of the signaling socket pair. The returned receiver
/// yields one event stream per newly-accepted connection; callers must
/// dispatch each independently (spec §5).
pub async fn bind_tcp(addr: SocketAddr) -> Result<(TcpTransport, NewConnectionEvents)> {
    TcpTransport::bind(addr).await
}

pub mod prelude {
    pub use crate::events::TransportEvent;
    pub use crate::transport::Transport;
    pub use crate::{bind_tcp, bind_udp, TcpTransport, UdpTransport};
}
