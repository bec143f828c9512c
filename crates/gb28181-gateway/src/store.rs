//! In-memory implementations of the `DeviceStore`/`ChannelDirectory`
//! persistence seams (SPEC_FULL.md §3): suitable for tests and small
//! deployments; a SQL-backed store is an explicit non-goal here (see
//! DESIGN.md's Open Questions).

use async_trait::async_trait;
use dashmap::DashMap;
use gb_infra::Result;
use gb_registrar::{Device, DeviceStore};
use gb_session::{Channel, ChannelDirectory};

#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: DashMap<String, Device>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        MemoryDeviceStore::default()
    }

    /// Seeds a known device/password pair, the way a config-file-driven
    /// provisioning step would before the gateway starts accepting REGISTER.
    pub fn seed(&self, device: Device) {
        self.devices.insert(device.device_id.clone(), device);
    }
}

#[async_trait]
impl DeviceStore for MemoryDeviceStore {
    async fn get(&self, device_id: &str) -> Result<Option<Device>> {
        Ok(self.devices.get(device_id).map(|entry| entry.clone()))
    }

    async fn upsert(&self, device: Device) -> Result<()> {
        self.devices.insert(device.device_id.clone(), device);
        Ok(())
    }

    async fn mark_registered(&self, device_id: &str) -> Result<()> {
        if let Some(mut entry) = self.devices.get_mut(device_id) {
            entry.registered = true;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryChannelDirectory {
    channels: DashMap<String, Channel>,
}

impl MemoryChannelDirectory {
    pub fn new() -> Self {
        MemoryChannelDirectory::default()
    }
}

#[async_trait]
impl ChannelDirectory for MemoryChannelDirectory {
    async fn get(&self, channel_id: &str) -> Result<Option<Channel>> {
        Ok(self.channels.get(channel_id).map(|entry| entry.clone()))
    }

    async fn upsert(&self, channel: Channel) -> Result<()> {
        self.channels.insert(channel.channel_id.clone(), channel);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_device_round_trips() {
        let store = MemoryDeviceStore::new();
        store.seed(Device::new("34020000001110000001", "secret"));
        let device = store.get("34020000001110000001").await.unwrap().unwrap();
        assert_eq!(device.password, "secret");

        store.mark_registered("34020000001110000001").await.unwrap();
        let device = store.get("34020000001110000001").await.unwrap().unwrap();
        assert!(device.registered);
    }

    #[tokio::test]
    async fn unknown_channel_is_none() {
        let channels = MemoryChannelDirectory::new();
        assert!(channels.get("nonexistent").await.unwrap().is_none());
    }
}
