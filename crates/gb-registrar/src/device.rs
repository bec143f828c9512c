//! The device record and the persistence seam the registrar talks to
//! (SPEC_FULL.md §3: "a `DeviceStore` trait is the only contract the core
//! has with persistent storage").

use std::net::SocketAddr;

use async_trait::async_trait;
use gb_infra::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub device_id: String,
    pub name: String,
    pub password: String,
    pub registered: bool,
    pub source: Option<SocketAddr>,
    pub active_at: Option<i64>,
    /// Transport the device registered over ("udp" or "tcp"); the session
    /// orchestrator sends outbound INVITE/BYE on this same transport.
    pub transport: String,
    /// Populated from a DeviceInfo MESSAGE body (spec §4.7), absent until
    /// the gateway's post-register query completes.
    pub manufacturer: Option<String>,
    pub model: Option<String>,
}

impl Device {
    pub fn new(device_id: impl Into<String>, password: impl Into<String>) -> Self {
        Device {
            device_id: device_id.into(),
            name: String::new(),
            password: password.into(),
            registered: false,
            source: None,
            active_at: None,
            transport: "udp".to_string(),
            manufacturer: None,
            model: None,
        }
    }

    pub fn is_tcp(&self) -> bool {
        self.transport.eq_ignore_ascii_case("tcp")
    }
}

/// The registrar's only contract with persistent storage; a missing device
/// is `Ok(None)`, not an error — only a real I/O problem is an `Err`.
#[async_trait]
pub trait DeviceStore: Send + Sync {
    async fn get(&self, device_id: &str) -> Result<Option<Device>>;
    async fn upsert(&self, device: Device) -> Result<()>;
    async fn mark_registered(&self, device_id: &str) -> Result<()>;
}
