//! Drives the outbound DeviceInfo re-query fired right after a device's
//! first successful REGISTER (SPEC_FULL.md §9, spec §4.6 step 2). Grounded
//! on `gb_session::Orchestrator::build_invite`'s pattern for constructing an
//! outbound request and sending it through the transaction table; the
//! original's equivalent is `sip/handler.go`'s `go sipDeviceInfo(fromUser)`.

use std::sync::Arc;

use async_trait::async_trait;
use gb_registrar::{Device, DeviceInfoQuerier};
use gb_sip_core::{Address, Method, RequestBuilder, Uri};
use gb_transaction::{TransactionKey, TransactionTable};
use gb_sip_transport::Transport;
use tracing::warn;

const DEVICE_INFO_QUERY_BODY: &str = concat!(
    "<?xml version=\"1.0\"?>\n",
    "<Query>\n<CmdType>DeviceInfo</CmdType>\n<SN>1</SN>\n<DeviceID>{device_id}</DeviceID>\n</Query>"
);

pub struct SipDeviceInfoQuerier {
    transactions: Arc<TransactionTable>,
    udp_transport: Arc<dyn Transport>,
    tcp_transport: Arc<dyn Transport>,
    server_device_id: String,
    server_host: String,
    server_port: u16,
}

impl SipDeviceInfoQuerier {
    pub fn new(
        transactions: Arc<TransactionTable>,
        udp_transport: Arc<dyn Transport>,
        tcp_transport: Arc<dyn Transport>,
        server_device_id: impl Into<String>,
        server_host: impl Into<String>,
        server_port: u16,
    ) -> Self {
        SipDeviceInfoQuerier {
            transactions,
            udp_transport,
            tcp_transport,
            server_device_id: server_device_id.into(),
            server_host: server_host.into(),
            server_port,
        }
    }
}

#[async_trait]
impl DeviceInfoQuerier for SipDeviceInfoQuerier {
    async fn query_device_info(&self, device: &Device) {
        let Some(destination) = device.source else {
            warn!(device_id = device.device_id, "cannot query DeviceInfo, device has no known source");
            return;
        };

        let transport_name = if device.is_tcp() { "TCP" } else { "UDP" };
        let transport: Arc<dyn Transport> =
            if device.is_tcp() { self.tcp_transport.clone() } else { self.udp_transport.clone() };

        let device_uri = Uri::new(device.device_id.clone(), self.server_host.clone());
        let server_uri = Uri::new(self.server_device_id.clone(), self.server_host.clone());

        let req = RequestBuilder::new(Method::Message, device_uri.clone())
            .via(gb_sip_core::Via::new(
                transport_name,
                format!("{}:{}", self.server_host, self.server_port),
                gb_sip_core::generate_branch(),
            ))
            .from_addr(Address::new(server_uri).with_tag(gb_sip_core::rand_string(20)))
            .to_addr(Address::new(device_uri))
            .call_id(gb_sip_core::rand_string(24))
            .cseq(1, Method::Message)
            .content_type("application/MANSCDP+xml")
            .body(DEVICE_INFO_QUERY_BODY.replace("{device_id}", &device.device_id).into_bytes())
            .destination(destination)
            .build();

        let Some(key) = TransactionKey::for_request(&req) else {
            warn!(device_id = device.device_id, "DeviceInfo query missing Via branch");
            return;
        };
        let tx = self.transactions.get_or_create(key, transport, destination, device.is_tcp());
        if let Err(e) = tx.request(req).await {
            warn!(device_id = device.device_id, error = %e, "failed to send DeviceInfo query");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_infra::Result as GbResult;
    use gb_sip_core::Message;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        local: SocketAddr,
        sent: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        fn local_addr(&self) -> SocketAddr {
            self.local
        }
        async fn send_message(&self, message: &Message, _destination: SocketAddr) -> GbResult<()> {
            if matches!(message, Message::Request(r) if r.method == Method::Message) {
                self.sent.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn skips_devices_with_no_known_source() {
        let table = TransactionTable::new();
        let transport: Arc<dyn Transport> = Arc::new(CountingTransport {
            local: "127.0.0.1:5060".parse().unwrap(),
            sent: AtomicUsize::new(0),
        });
        let querier = SipDeviceInfoQuerier::new(
            table,
            transport.clone(),
            transport,
            "34020000002000000001",
            "192.0.2.1",
            5060,
        );

        let device = Device::new("34020000001110000001", "secret");
        querier.query_device_info(&device).await;
    }

    #[tokio::test]
    async fn sends_a_message_query_for_a_known_device() {
        let table = TransactionTable::new();
        let transport = Arc::new(CountingTransport {
            local: "127.0.0.1:5060".parse().unwrap(),
            sent: AtomicUsize::new(0),
        });
        let transport_dyn: Arc<dyn Transport> = transport.clone();
        let querier = SipDeviceInfoQuerier::new(
            table,
            transport_dyn.clone(),
            transport_dyn,
            "34020000002000000001",
            "192.0.2.1",
            5060,
        );

        let mut device = Device::new("34020000001110000001", "secret");
        device.source = Some("192.0.2.50:5060".parse().unwrap());
        querier.query_device_info(&device).await;

        assert_eq!(transport.sent.load(Ordering::SeqCst), 1);
    }
}
