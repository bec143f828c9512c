//! BYE handling (spec §4.7): the sender must be an active device; a BYE
//! whose Call-ID matches a live talk session tears that session down.
//! Grounded on `examples/original_source/sip/handler.go`'s `handlerBye`,
//! generalized to drive `gb_session::Orchestrator::sip_stop_talk` instead of
//! the original's direct `StreamList` scan.

use std::sync::Arc;

use gb_registrar::ActiveDevices;
use gb_session::{ChannelDirectory, Orchestrator};
use gb_sip_core::{Request, Response};
use tracing::{info, warn};

use super::util::device_id_from_request;

pub async fn handle<C: ChannelDirectory + 'static>(
    req: &Request,
    active_devices: &ActiveDevices,
    orchestrator: &Arc<Orchestrator<C>>,
) -> Response {
    let Some(device_id) = device_id_from_request(req) else {
        return Response::from_request(req, 400, "Bad Request");
    };

    if active_devices.get(&device_id).is_none() {
        warn!(device_id, "BYE from a device that is not active");
        return Response::from_request(req, 401, "Unauthorized");
    }

    if let Some(call_id) = req.call_id() {
        if let Some(stream_id) = orchestrator.stream_id_for_call_id(call_id) {
            info!(stream_id, call_id, "BYE matches a live session, tearing down");
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move {
                if let Err(e) = orchestrator.sip_stop_talk(&stream_id).await {
                    warn!(stream_id, error = %e, "failed to tear down session after BYE");
                }
            });
        }
    }

    Response::from_request(req, 200, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gb_infra::Result as GbResult;
    use gb_media_client::MediaClient;
    use gb_session::{Channel, SessionConfig};
    use gb_sip_core::{Address, Header, Method, Uri, Via};
    use gb_sip_transport::Transport;
    use gb_transaction::TransactionTable;
    use gb_registrar::Device;
    use std::net::SocketAddr;

    struct EmptyChannels;

    #[async_trait]
    impl ChannelDirectory for EmptyChannels {
        async fn get(&self, _channel_id: &str) -> GbResult<Option<Channel>> {
            Ok(None)
        }
        async fn upsert(&self, _channel: Channel) -> GbResult<()> {
            Ok(())
        }
    }

    struct NoopTransport(SocketAddr);

    #[async_trait]
    impl Transport for NoopTransport {
        fn local_addr(&self) -> SocketAddr {
            self.0
        }
        async fn send_message(&self, _m: &gb_sip_core::Message, _d: SocketAddr) -> GbResult<()> {
            Ok(())
        }
    }

    fn bye_request(device_id: &str) -> Request {
        let uri = Uri::new(device_id, "192.0.2.50");
        let mut req = Request::new(Method::Bye, uri.clone());
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.50", "z9hG4bK-1".to_string())));
        req.append_header(Header::From(Address::new(uri)));
        req.append_header(Header::CallId("call-xyz".to_string()));
        req
    }

    fn test_orchestrator() -> Arc<Orchestrator<EmptyChannels>> {
        let transport: Arc<dyn Transport> = Arc::new(NoopTransport("127.0.0.1:5060".parse().unwrap()));
        Orchestrator::new(
            Arc::new(EmptyChannels),
            Arc::new(ActiveDevices::new()),
            TransactionTable::new(),
            MediaClient::new("http://127.0.0.1:1", "secret"),
            transport.clone(),
            transport,
            SessionConfig {
                server_device_id: "34020000002000000001".to_string(),
                server_host: "192.0.2.1".to_string(),
                server_port: 5060,
                media_rtp_ip: "192.0.2.1".parse().unwrap(),
                media_rtp_port: 30000,
                media_http_base: "http://media.example".to_string(),
                media_rtmp_base: "rtmp://media.example".to_string(),
                media_rtsp_base: "rtsp://media.example".to_string(),
                media_ws_base: "ws://media.example".to_string(),
                stream_ttl_secs: 120,
                evict_streams_on_bye: false,
            },
        )
    }

    #[tokio::test]
    async fn bye_from_inactive_device_is_rejected() {
        let active = ActiveDevices::new();
        let orchestrator = test_orchestrator();
        let resp = handle(&bye_request("34020000001110000001"), &active, &orchestrator).await;
        assert_eq!(resp.status, 401);
    }

    #[tokio::test]
    async fn bye_from_active_device_with_no_matching_session_still_200s() {
        let active = ActiveDevices::new();
        active.store(Device::new("34020000001110000001", "secret"));
        let orchestrator = test_orchestrator();
        let resp = handle(&bye_request("34020000001110000001"), &active, &orchestrator).await;
        assert_eq!(resp.status, 200);
    }
}
