//! MESSAGE handling (spec §4.7, component C8): XML envelope decoding with a
//! GBK-transcoding retry, then per-`CmdType` dispatch to update device and
//! channel state. Grounded on `examples/original_source/sip/handler.go`'s
//! `handlerMessage`.

use async_trait::async_trait;
use gb_infra::Result;
use gb_notify::{channels_active, devices_active, Notifier};
use gb_registrar::{ActiveDevices, DeviceStore};
use gb_session::{Channel, ChannelDirectory, ChannelStatus};
use gb_sip_core::{Request, Response};
use serde::Deserialize;
use tracing::warn;

/// The recording subsystem RecordInfo hands off to; out of this core's
/// scope beyond this interface (spec §4.7: "out of core scope beyond the
/// interface").
#[async_trait]
pub trait RecordingSink: Send + Sync {
    async fn handle_record_info(&self, device_id: &str, records: Vec<RecordEntry>);
}

#[derive(Debug, Clone)]
pub struct RecordEntry {
    pub name: Option<String>,
    pub file_path: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// A no-op sink for deployments (and tests) that don't wire up recording.
pub struct NullRecordingSink;

#[async_trait]
impl RecordingSink for NullRecordingSink {
    async fn handle_record_info(&self, _device_id: &str, _records: Vec<RecordEntry>) {}
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "CmdType")]
    cmd_type: String,
}

#[derive(Debug, Deserialize)]
struct CatalogEnvelope {
    #[serde(rename = "DeviceList", default)]
    device_list: Option<DeviceList>,
}

#[derive(Debug, Deserialize, Default)]
struct DeviceList {
    #[serde(rename = "Item", default)]
    items: Vec<CatalogItem>,
}

#[derive(Debug, Deserialize)]
struct CatalogItem {
    #[serde(rename = "DeviceID")]
    channel_id: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Status", default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct DeviceInfoEnvelope {
    #[serde(rename = "DeviceName", default)]
    device_name: Option<String>,
    #[serde(rename = "Manufacturer", default)]
    manufacturer: Option<String>,
    #[serde(rename = "Model", default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecordInfoEnvelope {
    #[serde(rename = "RecordList", default)]
    record_list: Option<RecordList>,
}

#[derive(Debug, Deserialize, Default)]
struct RecordList {
    #[serde(rename = "Item", default)]
    items: Vec<RecordItem>,
}

#[derive(Debug, Deserialize)]
struct RecordItem {
    #[serde(rename = "Name", default)]
    name: Option<String>,
    #[serde(rename = "FilePath", default)]
    file_path: Option<String>,
    #[serde(rename = "StartTime", default)]
    start_time: Option<String>,
    #[serde(rename = "EndTime", default)]
    end_time: Option<String>,
}

impl From<RecordItem> for RecordEntry {
    fn from(item: RecordItem) -> Self {
        RecordEntry {
            name: item.name,
            file_path: item.file_path,
            start_time: item.start_time,
            end_time: item.end_time,
        }
    }
}

pub async fn handle<S: DeviceStore, C: ChannelDirectory>(
    req: &Request,
    store: &S,
    channels: &C,
    active_devices: &ActiveDevices,
    notifier: &Notifier,
    recording: &dyn RecordingSink,
) -> Response {
    let Some(device_id) = super::util::device_id_from_request(req) else {
        return bad_request(req);
    };

    if req.body.is_empty() {
        return Response::from_request(req, 200, "OK");
    }

    let Some((text, envelope)) = decode_envelope(&req.body) else {
        return bad_request(req);
    };

    match envelope.cmd_type.as_str() {
        "Catalog" => handle_catalog(req, &text, &device_id, channels, notifier).await,
        "Keepalive" => handle_keepalive(req, &device_id, active_devices, notifier),
        "RecordInfo" => handle_record_info(req, &text, &device_id, recording).await,
        "DeviceInfo" => handle_device_info(req, &text, &device_id, store).await,
        _ => bad_request(req),
    }
}

/// Decodes a MESSAGE body into its envelope, retrying through a GBK
/// transcoder once on failure (spec §7: devices commonly emit GBK without
/// declaring it).
fn decode_envelope(body: &[u8]) -> Option<(String, Envelope)> {
    if let Ok(text) = std::str::from_utf8(body) {
        if let Ok(envelope) = quick_xml::de::from_str::<Envelope>(text) {
            return Some((text.to_string(), envelope));
        }
    }

    let (decoded, _, _) = encoding_rs::GBK.decode(body);
    let text = decoded.into_owned();
    quick_xml::de::from_str::<Envelope>(&text)
        .ok()
        .map(|envelope| (text, envelope))
}

async fn handle_catalog<C: ChannelDirectory>(
    req: &Request,
    body: &str,
    device_id: &str,
    channels: &C,
    notifier: &Notifier,
) -> Response {
    let Ok(parsed) = quick_xml::de::from_str::<CatalogEnvelope>(body) else {
        return bad_request(req);
    };

    for item in parsed.device_list.unwrap_or_default().items {
        let was_online = matches!(
            channels.get(&item.channel_id).await,
            Ok(Some(existing)) if existing.status == ChannelStatus::Online
        );

        let mut channel = Channel::new(item.channel_id.clone(), device_id.to_string(), String::new());
        channel.name = item.name;
        channel.status = if item.status.eq_ignore_ascii_case("ON") {
            ChannelStatus::Online
        } else {
            ChannelStatus::Offline
        };
        let now_online = channel.status == ChannelStatus::Online;

        if let Err(e) = channels.upsert(channel).await {
            warn!(channel_id = item.channel_id, error = %e, "failed to upsert channel from Catalog");
            continue;
        }

        if now_online && !was_online {
            notifier.spawn_notify(channels_active(&item.channel_id, "ON"));
        }
    }

    Response::from_request(req, 200, "OK")
}

fn handle_keepalive(req: &Request, device_id: &str, active_devices: &ActiveDevices, notifier: &Notifier) -> Response {
    let became_active = active_devices.touch(device_id, now());
    if became_active {
        notifier.spawn_notify(devices_active(device_id, "ON"));
    }
    Response::from_request(req, 200, "OK")
}

async fn handle_record_info(req: &Request, body: &str, device_id: &str, recording: &dyn RecordingSink) -> Response {
    let Ok(parsed) = quick_xml::de::from_str::<RecordInfoEnvelope>(body) else {
        return bad_request(req);
    };
    let records: Vec<RecordEntry> = parsed
        .record_list
        .unwrap_or_default()
        .items
        .into_iter()
        .map(RecordEntry::from)
        .collect();
    recording.handle_record_info(device_id, records).await;
    Response::from_request(req, 200, "OK")
}

async fn handle_device_info<S: DeviceStore>(req: &Request, body: &str, device_id: &str, store: &S) -> Response {
    let Ok(parsed) = quick_xml::de::from_str::<DeviceInfoEnvelope>(body) else {
        return bad_request(req);
    };

    match store.get(device_id).await {
        Ok(Some(mut device)) => {
            if let Some(name) = parsed.device_name {
                device.name = name;
            }
            if parsed.manufacturer.is_some() {
                device.manufacturer = parsed.manufacturer;
            }
            if parsed.model.is_some() {
                device.model = parsed.model;
            }
            if let Err(e) = store.upsert(device).await {
                warn!(device_id, error = %e, "failed to persist DeviceInfo update");
            }
        }
        Ok(None) => warn!(device_id, "DeviceInfo for a device not in the store"),
        Err(e) => warn!(device_id, error = %e, "device store lookup failed"),
    }

    Response::from_request(req, 200, "OK")
}

fn bad_request(req: &Request) -> Response {
    Response::from_request(req, 400, "Bad Request")
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gb_registrar::Device;
    use gb_sip_core::{Address, Header, Method, Uri, Via};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemDeviceStore {
        devices: Mutex<HashMap<String, Device>>,
    }

    #[async_trait]
    impl DeviceStore for MemDeviceStore {
        async fn get(&self, device_id: &str) -> Result<Option<Device>> {
            Ok(self.devices.lock().unwrap().get(device_id).cloned())
        }
        async fn upsert(&self, device: Device) -> Result<()> {
            self.devices.lock().unwrap().insert(device.device_id.clone(), device);
            Ok(())
        }
        async fn mark_registered(&self, _device_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemChannels {
        channels: Mutex<HashMap<String, Channel>>,
    }

    #[async_trait]
    impl ChannelDirectory for MemChannels {
        async fn get(&self, channel_id: &str) -> Result<Option<Channel>> {
            Ok(self.channels.lock().unwrap().get(channel_id).cloned())
        }
        async fn upsert(&self, channel: Channel) -> Result<()> {
            self.channels.lock().unwrap().insert(channel.channel_id.clone(), channel);
            Ok(())
        }
    }

    fn message_request(device_id: &str, body: &str) -> Request {
        let uri = Uri::new(device_id, "192.0.2.50");
        let mut req = Request::new(Method::Message, uri.clone());
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.50", "z9hG4bK-1".to_string())));
        req.append_header(Header::From(Address::new(uri)));
        req.body = body.as_bytes().to_vec();
        req
    }

    #[tokio::test]
    async fn catalog_upserts_channels_and_notifies_once() {
        let body = r#"<?xml version="1.0"?>
<Response>
<CmdType>Catalog</CmdType>
<SN>1</SN>
<DeviceID>34020000001110000001</DeviceID>
<DeviceList Num="1">
<Item>
<DeviceID>34020000001310000001</DeviceID>
<Name>Camera1</Name>
<Status>ON</Status>
</Item>
</DeviceList>
</Response>"#;

        let store = MemDeviceStore::default();
        let channels = MemChannels::default();
        let active = ActiveDevices::new();
        let notifier = Notifier::new(HashMap::new());
        let recording = NullRecordingSink;

        let resp = handle(
            &message_request("34020000001110000001", body),
            &store,
            &channels,
            &active,
            &notifier,
            &recording,
        )
        .await;

        assert_eq!(resp.status, 200);
        let channel = channels.get("34020000001310000001").await.unwrap().unwrap();
        assert_eq!(channel.status, ChannelStatus::Online);
        assert_eq!(channel.device_id, "34020000001110000001");
    }

    #[tokio::test]
    async fn keepalive_touches_active_device() {
        let store = MemDeviceStore::default();
        let channels = MemChannels::default();
        let active = ActiveDevices::new();
        active.store(Device::new("34020000001110000001", "secret"));
        let notifier = Notifier::new(HashMap::new());
        let recording = NullRecordingSink;

        let body = r#"<Notify><CmdType>Keepalive</CmdType><SN>1</SN><DeviceID>34020000001110000001</DeviceID><Status>OK</Status></Notify>"#;
        let resp = handle(
            &message_request("34020000001110000001", body),
            &store,
            &channels,
            &active,
            &notifier,
            &recording,
        )
        .await;

        assert_eq!(resp.status, 200);
        assert!(active.get("34020000001110000001").unwrap().active_at.is_some());
    }

    #[tokio::test]
    async fn device_info_updates_manufacturer_and_model() {
        let store = MemDeviceStore::default();
        store.upsert(Device::new("34020000001110000001", "secret")).await.unwrap();
        let channels = MemChannels::default();
        let active = ActiveDevices::new();
        let notifier = Notifier::new(HashMap::new());
        let recording = NullRecordingSink;

        let body = r#"<Response><CmdType>DeviceInfo</CmdType><SN>1</SN><DeviceID>34020000001110000001</DeviceID><DeviceName>NVR-1</DeviceName><Manufacturer>Acme</Manufacturer><Model>X100</Model></Response>"#;
        let resp = handle(
            &message_request("34020000001110000001", body),
            &store,
            &channels,
            &active,
            &notifier,
            &recording,
        )
        .await;

        assert_eq!(resp.status, 200);
        let device = store.get("34020000001110000001").await.unwrap().unwrap();
        assert_eq!(device.manufacturer.as_deref(), Some("Acme"));
        assert_eq!(device.model.as_deref(), Some("X100"));
    }

    #[tokio::test]
    async fn unrecognized_cmd_type_is_bad_request() {
        let store = MemDeviceStore::default();
        let channels = MemChannels::default();
        let active = ActiveDevices::new();
        let notifier = Notifier::new(HashMap::new());
        let recording = NullRecordingSink;

        let body = r#"<Response><CmdType>Bogus</CmdType><SN>1</SN></Response>"#;
        let resp = handle(
            &message_request("34020000001110000001", body),
            &store,
            &channels,
            &active,
            &notifier,
            &recording,
        )
        .await;
        assert_eq!(resp.status, 400);
    }

    #[tokio::test]
    async fn empty_body_is_ok() {
        let store = MemDeviceStore::default();
        let channels = MemChannels::default();
        let active = ActiveDevices::new();
        let notifier = Notifier::new(HashMap::new());
        let recording = NullRecordingSink;

        let resp = handle(
            &message_request("34020000001110000001", ""),
            &store,
            &channels,
            &active,
            &notifier,
            &recording,
        )
        .await;
        assert_eq!(resp.status, 200);
    }
}
