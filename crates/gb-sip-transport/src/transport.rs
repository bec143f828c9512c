//! The protocol-agnostic send side of wire I/O (spec §4.1: "outbound
//! delivery is protocol-selected").

use std::net::SocketAddr;

use async_trait::async_trait;
use gb_infra::Result;
use gb_sip_core::Message;

#[async_trait]
pub trait Transport: Send + Sync {
    fn local_addr(&self) -> SocketAddr;
    async fn send_message(&self, message: &Message, destination: SocketAddr) -> Result<()>;
}
