//! TCP wire I/O: listener + per-connection reader task, reassembling a
//! byte stream into whole SIP messages via [`crate::framing`], plus the TCP
//! connection registry spec §3/§4.1 describe (remote address -> the
//! connection's write half, alive for as long as the reader task runs).

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use async_trait::async_trait;
use gb_infra::{Error, Result};
use gb_sip_core::parse_message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::events::TransportEvent;
use crate::framing::extract_message;
use crate::transport::Transport;

const READ_BUFFER: usize = 65507;
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// A registered outbound write channel for one TCP connection.
type ConnectionHandle = mpsc::Sender<Vec<u8>>;

#[derive(Clone)]
pub struct TcpTransport {
    local_addr: SocketAddr,
    connections: Arc<DashMap<SocketAddr, ConnectionHandle>>,
}

/// Each accepted connection gets its own event channel; this is the channel
/// of *those* channels, one item per newly-accepted connection. Spec §5
/// requires an independent dispatcher per TCP connection so that a slow
/// handler on one socket cannot stall another — sharing a single event
/// channel across connections (as an earlier revision did) meant any one
/// connection's `Closed` event terminated SIP processing for every other
/// connection, since a single dispatcher loop consumed them all.
pub type NewConnectionEvents = mpsc::Receiver<mpsc::Receiver<TransportEvent>>;

impl TcpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<(Self, NewConnectionEvents)> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let transport = TcpTransport {
            local_addr,
            connections: Arc::new(DashMap::new()),
        };

        let (new_conns_tx, new_conns_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        transport.spawn_accept_loop(listener, new_conns_tx);
        Ok((transport, new_conns_rx))
    }

    fn spawn_accept_loop(&self, listener: TcpListener, new_conns_tx: mpsc::Sender<mpsc::Receiver<TransportEvent>>) {
        let connections = self.connections.clone();
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        info!(%remote, "accepted TCP connection");
                        let (events_tx, events_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
                        spawn_connection(stream, remote, local_addr, connections.clone(), events_tx);
                        if new_conns_tx.send(events_rx).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "TCP accept failed");
                    }
                }
            }
        });
    }
}

fn spawn_connection(
    stream: TcpStream,
    remote: SocketAddr,
    local_addr: SocketAddr,
    connections: Arc<DashMap<SocketAddr, ConnectionHandle>>,
    events_tx: mpsc::Sender<TransportEvent>,
) {
    let (mut read_half, mut write_half) = stream.into_split();

    let (write_tx, mut write_rx) = mpsc::channel::<Vec<u8>>(DEFAULT_CHANNEL_CAPACITY);
    connections.insert(remote, write_tx);

    // Writer task: serializes all outbound sends to this connection.
    tokio::spawn(async move {
        while let Some(bytes) = write_rx.recv().await {
            if let Err(e) = write_half.write_all(&bytes).await {
                warn!(%remote, error = %e, "TCP write failed");
                break;
            }
        }
    });

    // Reader task: owns the reassembly buffer for this connection.
    let connections_for_cleanup = connections.clone();
    tokio::spawn(async move {
        let mut stream_buffer: Vec<u8> = Vec::new();
        let mut read_buf = vec![0u8; READ_BUFFER];

        loop {
            match read_half.read(&mut read_buf).await {
                Ok(0) => {
                    debug!(%remote, "TCP connection closed by peer");
                    break;
                }
                Ok(n) => {
                    stream_buffer.extend_from_slice(&read_buf[..n]);
                    loop {
                        let (message, remainder) = extract_message(&stream_buffer);
                        stream_buffer = remainder;
                        let Some(raw) = message else { break };
                        match parse_message(&raw, remote) {
                            Ok(mut msg) => {
                                msg.set_destination(local_addr);
                                let event = TransportEvent::MessageReceived {
                                    message: msg,
                                    source: remote,
                                    destination: local_addr,
                                };
                                if events_tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Err(e) => {
                                warn!(%remote, error = %e, "failed to parse TCP-framed SIP message");
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(%remote, error = %e, "TCP read failed");
                    break;
                }
            }
        }

        connections_for_cleanup.remove(&remote);
        let _ = events_tx.send(TransportEvent::Closed).await;
    });
}

#[async_trait]
impl Transport for TcpTransport {
    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn send_message(&self, message: &gb_sip_core::Message, destination: SocketAddr) -> Result<()> {
        let bytes = match message {
            gb_sip_core::Message::Request(r) => r.to_bytes(),
            gb_sip_core::Message::Response(r) => r.to_bytes(),
        };
        let handle = self
            .connections
            .get(&destination)
            .ok_or(Error::NoTcpConnection(destination))?;
        handle
            .send(bytes)
            .await
            .map_err(|_| Error::NoTcpConnection(destination))?;
        Ok(())
    }
}
