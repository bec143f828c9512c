//! The channel directory: GB28181 device sub-channels, keyed by
//! channel-id (spec §3's Channel entity). The session orchestrator only
//! needs to read a channel's owning device and play mode; Catalog
//! ingestion (component C8) is the only writer.

use async_trait::async_trait;
use gb_infra::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Push,
}

impl Default for StreamType {
    fn default() -> Self {
        StreamType::Push
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub channel_id: String,
    pub device_id: String,
    pub name: String,
    pub uri: String,
    pub stream_type: StreamType,
    pub status: ChannelStatus,
}

impl Channel {
    pub fn new(channel_id: impl Into<String>, device_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Channel {
            channel_id: channel_id.into(),
            device_id: device_id.into(),
            name: String::new(),
            uri: uri.into(),
            stream_type: StreamType::Push,
            status: ChannelStatus::Offline,
        }
    }
}

#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn get(&self, channel_id: &str) -> Result<Option<Channel>>;
    async fn upsert(&self, channel: Channel) -> Result<()>;
}
