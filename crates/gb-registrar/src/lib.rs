//! Digest-authenticated REGISTER handling and the active-device table
//! (spec §4.6, component C7).

pub mod active;
pub mod device;
pub mod registrar;

pub use active::ActiveDevices;
pub use device::{Device, DeviceStore};
pub use registrar::{DeviceInfoQuerier, Registrar};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gb_infra::Result;
    use gb_notify::Notifier;
    use gb_sip_core::{Header, Method, Request, Uri, Via};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemStore {
        devices: Mutex<HashMap<String, Device>>,
    }

    #[async_trait]
    impl DeviceStore for MemStore {
        async fn get(&self, device_id: &str) -> Result<Option<Device>> {
            Ok(self.devices.lock().unwrap().get(device_id).cloned())
        }

        async fn upsert(&self, device: Device) -> Result<()> {
            self.devices.lock().unwrap().insert(device.device_id.clone(), device);
            Ok(())
        }

        async fn mark_registered(&self, device_id: &str) -> Result<()> {
            if let Some(d) = self.devices.lock().unwrap().get_mut(device_id) {
                d.registered = true;
            }
            Ok(())
        }
    }

    struct NoopQuerier;

    #[async_trait]
    impl DeviceInfoQuerier for NoopQuerier {
        async fn query_device_info(&self, _device: &Device) {}
    }

    fn register_request(device_id: &str) -> Request {
        let uri = Uri::new(device_id, "192.0.2.50");
        let mut req = Request::new(Method::Register, uri.clone());
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.50", "z9hG4bK-test".to_string())));
        req.append_header(Header::From(gb_sip_core::Address::new(uri)));
        req
    }

    fn registrar() -> Registrar<MemStore> {
        let store = Arc::new(MemStore::default());
        store
            .devices
            .lock()
            .unwrap()
            .insert("34020000001320000001".to_string(), Device::new("34020000001320000001", "secret"));
        Registrar::new(
            store,
            Arc::new(ActiveDevices::new()),
            Notifier::new(HashMap::new()),
            Arc::new(NoopQuerier),
            "3402000000",
        )
    }

    #[tokio::test]
    async fn unauthenticated_known_device_gets_challenge() {
        let registrar = registrar();
        let req = register_request("34020000001320000001");
        let addr: SocketAddr = "192.0.2.50:5060".parse().unwrap();
        let resp = registrar.handle_register(&req, addr).await.unwrap();
        assert_eq!(resp.status, 401);
        assert!(resp.header("WWW-Authenticate").is_some());
    }

    #[tokio::test]
    async fn unauthenticated_unknown_device_gets_bare_401_with_no_challenge() {
        let registrar = registrar();
        let req = register_request("99999999999999999999");
        let addr: SocketAddr = "192.0.2.51:5060".parse().unwrap();
        let resp = registrar.handle_register(&req, addr).await.unwrap();
        assert_eq!(resp.status, 401);
        assert!(resp.header("WWW-Authenticate").is_none());
    }

    #[tokio::test]
    async fn mismatched_digest_is_rejected() {
        let registrar = registrar();
        let mut req = register_request("34020000001320000001");
        req.append_header(Header::Generic(gb_sip_core::GenericHeader::new(
            "Authorization",
            r#"Digest username="34020000001320000001", realm="3402000000", nonce="abc", uri="sip:x@y", response="wrong", qop=auth, nc=00000001, cnonce="123""#,
        )));
        let addr: SocketAddr = "192.0.2.50:5060".parse().unwrap();
        let resp = registrar.handle_register(&req, addr).await.unwrap();
        assert_eq!(resp.status, 401);
    }
}
