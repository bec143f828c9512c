//! The active-devices table: devices that have completed at least one
//! successful REGISTER, keyed by device-id (spec §3's "Active Devices
//! table"). NOTIFY and BYE handling consult this before acting on a
//! request from a device that was never challenged successfully.

use dashmap::DashMap;

use crate::device::Device;

#[derive(Default)]
pub struct ActiveDevices {
    devices: DashMap<String, Device>,
}

impl ActiveDevices {
    pub fn new() -> Self {
        ActiveDevices { devices: DashMap::new() }
    }

    pub fn store(&self, device: Device) {
        self.devices.insert(device.device_id.clone(), device);
    }

    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.devices.get(device_id).map(|entry| entry.clone())
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.devices.contains_key(device_id)
    }

    /// Updates `active_at` for a device already known to be active,
    /// returning whether this is a state change worth notifying on (the
    /// device had no prior active timestamp).
    pub fn touch(&self, device_id: &str, now: i64) -> bool {
        match self.devices.get_mut(device_id) {
            Some(mut entry) => {
                let was_inactive = entry.active_at.is_none();
                entry.active_at = Some(now);
                was_inactive
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
