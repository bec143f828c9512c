//! UDP wire I/O: a single shared socket, one receive loop, datagram-at-a-time
//! (spec §4.1). Failures on read are logged and the loop continues since UDP
//! is datagram-oriented — one bad packet never blocks the next.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use gb_infra::{Error, Result};
use gb_sip_core::parse_message;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::events::TransportEvent;
use crate::transport::Transport;

const RECV_BUFFER: usize = 65507;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<(Self, mpsc::Receiver<TransportEvent>)> {
        let socket = UdpSocket::bind(addr).await?;
        let local_addr = socket.local_addr()?;
        let transport = UdpTransport {
            socket: Arc::new(socket),
            local_addr,
        };

        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        transport.spawn_receive_loop(tx);
        Ok((transport, rx))
    }

    fn spawn_receive_loop(&self, events_tx: mpsc::Sender<TransportEvent>) {
        let socket = self.socket.clone();
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            let mut buf = vec![0u8; RECV_BUFFER];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((n, source)) => {
                        debug!(%source, bytes = n, "received UDP datagram");
                        let packet = buf[..n].to_vec();
                        match parse_message(&packet, source) {
                            Ok(mut message) => {
                                message.set_destination(local_addr);
                                let event = TransportEvent::MessageReceived {
                                    message,
                                    source,
                                    destination: local_addr,
                                };
                                if events_tx.send(event).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(%source, error = %e, "failed to parse SIP datagram");
                                let _ = events_tx
                                    .send(TransportEvent::Error {
                                        error: format!("parse error from {source}: {e}"),
                                    })
                                    .await;
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "UDP recv_from failed");
                        let _ = events_tx
                            .send(TransportEvent::Error {
                                error: format!("recv error: {e}"),
                            })
                            .await;
                    }
                }
            }
        });
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send_message(&self, message: &gb_sip_core::Message, destination: SocketAddr) -> Result<()> {
        let bytes = match message {
            gb_sip_core::Message::Request(r) => r.to_bytes(),
            gb_sip_core::Message::Response(r) => r.to_bytes(),
        };
        self.socket
            .send_to(&bytes, destination)
            .await
            .map_err(Error::Io)?;
        Ok(())
    }
}
