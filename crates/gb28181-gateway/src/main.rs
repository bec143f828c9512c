//! Process bootstrap: load configuration, bind the UDP and TCP SIP
//! listeners, wire the registrar/orchestrator/dispatcher together, and serve
//! the admin trigger HTTP route alongside them (SPEC_FULL.md §6).

mod http;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gb_infra::logging::{self, LoggingConfig};
use gb_infra::GatewayConfig;
use gb_media_client::MediaClient;
use gb_notify::Notifier;
use gb_registrar::{ActiveDevices, Registrar};
use gb_session::{Orchestrator, SessionConfig};
use gb_signaling::handlers::message::NullRecordingSink;
use gb_signaling::{Dispatcher, SipDeviceInfoQuerier};
use gb_sip_transport::{TcpTransport, Transport, UdpTransport};
use gb_transaction::TransactionTable;
use tracing::info;

use store::{MemoryChannelDirectory, MemoryDeviceStore};

const DEFAULT_CONFIG_PATH: &str = "gateway.toml";
const DEFAULT_HTTP_LISTEN: &str = "0.0.0.0:8080";
const REAPER_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<()> {
    logging::init(LoggingConfig::default());

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading config file {config_path}"))?;
    let config = GatewayConfig::from_toml_str(&raw).context("parsing gateway config")?;

    run(config).await
}

async fn run(config: GatewayConfig) -> Result<()> {
    let sip_addr: SocketAddr = config.sip_listen.parse().context("parsing sip_listen")?;

    let (udp_transport, udp_events) = UdpTransport::bind(sip_addr)
        .await
        .context("binding UDP SIP listener")?;
    let (tcp_transport, mut new_tcp_conns) = TcpTransport::bind(sip_addr)
        .await
        .context("binding TCP SIP listener")?;
    info!(%sip_addr, "SIP listeners bound");

    let udp_dyn: Arc<dyn Transport> = Arc::new(udp_transport);
    let tcp_dyn: Arc<dyn Transport> = Arc::new(tcp_transport);

    let device_store = Arc::new(MemoryDeviceStore::new());
    let channels = Arc::new(MemoryChannelDirectory::new());
    let active_devices = Arc::new(ActiveDevices::new());
    let transactions = TransactionTable::new();

    let notifier = Notifier::new(config.notify_map.clone());

    let media = MediaClient::new(config.media.restful.clone(), config.media.secret.clone());

    let sip_host = sip_addr.ip().to_string();
    let querier = Arc::new(SipDeviceInfoQuerier::new(
        transactions.clone(),
        udp_dyn.clone(),
        tcp_dyn.clone(),
        config.gb28181.device_id.clone(),
        sip_host.clone(),
        sip_addr.port(),
    ));

    let registrar = Arc::new(Registrar::new(
        device_store,
        active_devices.clone(),
        notifier,
        querier,
        config.region.clone(),
    ));

    let session_config = SessionConfig {
        server_device_id: config.gb28181.device_id.clone(),
        server_host: sip_host,
        server_port: sip_addr.port(),
        media_rtp_ip: config.media.rtp_ip,
        media_rtp_port: config.media.rtp_port,
        media_http_base: config.media.http.clone(),
        media_rtmp_base: config.media.rtmp.clone(),
        media_rtsp_base: config.media.rtsp.clone(),
        media_ws_base: config.media.ws.clone(),
        stream_ttl_secs: 120,
        evict_streams_on_bye: false,
    };

    let orchestrator = Orchestrator::new(
        channels.clone(),
        active_devices.clone(),
        transactions.clone(),
        media,
        udp_dyn.clone(),
        tcp_dyn.clone(),
        session_config,
    );
    orchestrator.spawn_reaper(REAPER_INTERVAL);

    let dispatcher = Dispatcher::new(
        registrar,
        channels,
        orchestrator.clone(),
        transactions,
        active_devices,
        Arc::new(NullRecordingSink),
    );
    dispatcher.run(udp_events, udp_dyn, false);

    // Each accepted TCP connection gets its own dispatcher loop (spec §5):
    // a slow handler or a peer disconnect on one connection must never stall
    // or terminate processing for any other connection.
    {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            while let Some(conn_events) = new_tcp_conns.recv().await {
                dispatcher.run(conn_events, tcp_dyn.clone(), true);
            }
        });
    }

    let http_addr: SocketAddr = DEFAULT_HTTP_LISTEN.parse().expect("valid default HTTP listen address");
    let listener = tokio::net::TcpListener::bind(http_addr)
        .await
        .context("binding admin HTTP listener")?;
    info!(%http_addr, "admin HTTP surface bound");

    axum::serve(listener, http::router(orchestrator))
        .await
        .context("admin HTTP server failed")
}
