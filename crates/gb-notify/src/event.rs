//! Event constructors for the five notification methods this gateway emits
//! (spec §4.9, grounded on `examples/original_source/sip/notify.go`).

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Serialize)]
pub struct NotifyEvent {
    pub method: &'static str,
    pub data: Value,
}

pub const METHOD_DEVICES_UNKNOWN: &str = "devices.unknown";
pub const METHOD_DEVICES_ACTIVE: &str = "devices.active";
pub const METHOD_DEVICES_REGISTER: &str = "devices.register";
pub const METHOD_CHANNELS_ACTIVE: &str = "channels.active";
pub const METHOD_RECORDS_STOP: &str = "records.stop";

pub fn devices_unknown(device_id: &str, addr: &str) -> NotifyEvent {
    NotifyEvent {
        method: METHOD_DEVICES_UNKNOWN,
        data: json!({
            "deviceid": device_id,
            "addr": addr,
            "time": chrono::Utc::now().timestamp(),
            "message": "unknown device attempted registration",
        }),
    }
}

pub fn devices_active(device_id: &str, status: &str) -> NotifyEvent {
    NotifyEvent {
        method: METHOD_DEVICES_ACTIVE,
        data: json!({
            "deviceid": device_id,
            "status": status,
            "time": chrono::Utc::now().timestamp(),
        }),
    }
}

pub fn devices_register(device_id: &str, name: &str) -> NotifyEvent {
    NotifyEvent {
        method: METHOD_DEVICES_REGISTER,
        data: json!({
            "deviceid": device_id,
            "name": name,
            "time": chrono::Utc::now().timestamp(),
        }),
    }
}

pub fn channels_active(channel_id: &str, status: &str) -> NotifyEvent {
    NotifyEvent {
        method: METHOD_CHANNELS_ACTIVE,
        data: json!({
            "channelid": channel_id,
            "status": status,
            "time": chrono::Utc::now().timestamp(),
        }),
    }
}

pub fn records_stop(url: &str, stream_id: &str) -> NotifyEvent {
    NotifyEvent {
        method: METHOD_RECORDS_STOP,
        data: json!({
            "url": url,
            "streamid": stream_id,
            "time": chrono::Utc::now().timestamp(),
        }),
    }
}
