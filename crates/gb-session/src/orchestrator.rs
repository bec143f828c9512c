//! The session orchestrator (spec §4.8, component C9): couples the SIP
//! dialog layer to the media engine for GB28181 talk sessions. Grounded on
//! `examples/original_source/sip/talk.go`'s `SipTalk`/`sipTalkPush`/
//! `SipStopTalk`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gb_infra::{Error, Result};
use gb_media_client::{MediaClient, OpenRtpServerRequest};
use gb_registrar::ActiveDevices;
use gb_sip_core::sdp::SdpSession;
use gb_sip_core::{Address, Message, Method, Request, RequestBuilder, Uri};
use gb_sip_transport::Transport;
use gb_transaction::{TransactionKey, TransactionTable};
use tracing::{info, warn};

use crate::channel::{ChannelDirectory, StreamType};
use crate::config::SessionConfig;
use crate::ssrc::{stream_id_for_ssrc, SsrcAllocator};
use crate::stream::{Stream, StreamStatus};

pub struct TalkRequest {
    pub channel_id: String,
    pub start: i64,
    pub end: i64,
    /// Session-type nibble folded into the SSRC; `0` also marks "the
    /// canonical live session for this channel" (spec: `StreamList.Succ`).
    pub session_type: u8,
}

pub struct Orchestrator<C: ChannelDirectory> {
    channels: Arc<C>,
    active_devices: Arc<ActiveDevices>,
    transactions: Arc<TransactionTable>,
    media: MediaClient,
    udp_transport: Arc<dyn Transport>,
    tcp_transport: Arc<dyn Transport>,
    ssrc: SsrcAllocator,
    streams: DashMap<String, Stream>,
    channel_live: DashMap<String, String>,
    config: SessionConfig,
}

impl<C: ChannelDirectory + 'static> Orchestrator<C> {
    pub fn new(
        channels: Arc<C>,
        active_devices: Arc<ActiveDevices>,
        transactions: Arc<TransactionTable>,
        media: MediaClient,
        udp_transport: Arc<dyn Transport>,
        tcp_transport: Arc<dyn Transport>,
        config: SessionConfig,
    ) -> Arc<Self> {
        Arc::new(Orchestrator {
            channels,
            active_devices,
            transactions,
            media,
            udp_transport,
            tcp_transport,
            ssrc: SsrcAllocator::new(),
            streams: DashMap::new(),
            channel_live: DashMap::new(),
            config,
        })
    }

    pub fn get_stream(&self, stream_id: &str) -> Option<Stream> {
        self.streams.get(stream_id).map(|e| e.clone())
    }

    pub fn live_stream_for_channel(&self, channel_id: &str) -> Option<String> {
        self.channel_live.get(channel_id).map(|e| e.clone())
    }

    /// Finds the stream whose dialog owns `call_id`, for BYE teardown
    /// (spec §4.7: "BYE on a matching Call-ID tears down the stream").
    pub fn stream_id_for_call_id(&self, call_id: &str) -> Option<String> {
        self.streams
            .iter()
            .find(|entry| entry.value().call_id.as_deref() == Some(call_id))
            .map(|entry| entry.key().clone())
    }

    /// Spec §4.8's `SipTalk`: allocate, open the media receiver, exchange
    /// INVITE/ACK, and publish the resulting stream.
    pub async fn sip_talk(&self, request: TalkRequest) -> Result<Stream> {
        let channel = self
            .channels
            .get(&request.channel_id)
            .await?
            .ok_or_else(|| Error::ChannelNotFound(request.channel_id.clone()))?;

        let device = self
            .active_devices
            .get(&channel.device_id)
            .ok_or(Error::DeviceOffline)?;
        let device_addr = device.source.ok_or(Error::DeviceOffline)?;

        let ssrc = self.ssrc.allocate(request.session_type);
        let stream_id = stream_id_for_ssrc(ssrc);

        let open_req = OpenRtpServerRequest {
            stream_id: stream_id.clone(),
            enable_tcp: device.is_tcp(),
            port: self.config.media_rtp_port,
        };
        let open_resp = self.media.open_rtp_server(open_req).await?;
        let media_port = if open_resp.port > 0 { open_resp.port } else { self.config.media_rtp_port };

        let mut stream = Stream::new(stream_id.clone(), channel.channel_id.clone(), channel.device_id.clone(), ssrc, request.session_type);
        stream.stream_type = channel.stream_type;
        stream.start = request.start;
        stream.end = request.end;

        let sdp = SdpSession {
            origin_username: self.config.server_device_id.clone(),
            connection_ip: self.config.media_rtp_ip,
            session_name: "Talk".to_string(),
            media_port,
            protocol: "TCP/RTP/AVP".to_string(),
            payload_type: 8,
            codec_name: "PCMA".to_string(),
            clock_rate: 8000,
            sendonly: true,
            start: request.start,
            end: request.end,
            ssrc,
        };

        let channel_uri = Uri::parse(&channel.uri).map_err(|e| Error::Internal(e.to_string()))?;
        let invite = self.build_invite(&channel, &channel_uri, &stream_id, sdp.render().into_bytes(), device_addr, device.is_tcp());

        let transport: Arc<dyn Transport> = if device.is_tcp() { self.tcp_transport.clone() } else { self.udp_transport.clone() };
        let key = TransactionKey::for_request(&invite).ok_or_else(|| Error::Internal("INVITE missing Via".into()))?;
        let tx = self.transactions.get_or_create(key, transport.clone(), device_addr, device.is_tcp());
        tx.request(invite).await?;

        let response = tx.next_response().await?;
        if !response.is_success() {
            return Err(Error::Internal(format!("INVITE rejected: {} {}", response.status, response.reason)));
        }

        let ack = Request::from_response(Method::Ack, &response);
        if let Err(e) = transport.send_message(&Message::Request(ack), device_addr).await {
            warn!(stream_id, error = %e, "failed to send ACK");
        }

        stream.call_id = response.call_id().map(str::to_string);
        stream.cseq = response.cseq().map(|c| c.seq);
        stream.to_tag = response.to_header().and_then(|a| a.tag()).map(str::to_string);
        stream.from_tag = response.from_header().and_then(|a| a.tag()).map(str::to_string);
        stream.invite_response = Some(response);
        stream.status = StreamStatus::Talking;

        stream.http_url = format!("{}/rtp/{}/hls.m3u8", self.config.media_http_base, stream_id);
        stream.rtmp_url = format!("{}/rtp/{}", self.config.media_rtmp_base, stream_id);
        stream.rtsp_url = format!("{}/rtp/{}", self.config.media_rtsp_base, stream_id);
        stream.ws_flv_url = format!("{}/rtp/{}.live.flv", self.config.media_ws_base, stream_id);
        stream.ext = now() + self.config.stream_ttl_secs;

        self.streams.insert(stream_id.clone(), stream.clone());
        if request.session_type == 0 {
            self.channel_live.insert(channel.channel_id.clone(), stream_id.clone());
        }

        info!(stream_id, channel_id = channel.channel_id, "talk session established");
        Ok(stream)
    }

    fn build_invite(
        &self,
        channel: &crate::channel::Channel,
        channel_uri: &Uri,
        stream_id: &str,
        sdp_body: Vec<u8>,
        destination: std::net::SocketAddr,
        is_tcp: bool,
    ) -> Request {
        let transport_name = if is_tcp { "TCP" } else { "UDP" };
        let from_tag = gb_sip_core::rand_string(20);
        let server_uri = Uri::new(self.config.server_device_id.clone(), self.config.server_host.clone());

        RequestBuilder::new(Method::Invite, channel_uri.clone())
            .via(gb_sip_core::Via::new(
                transport_name,
                format!("{}:{}", self.config.server_host, self.config.server_port),
                gb_sip_core::generate_branch(),
            ))
            .from_addr(Address::new(server_uri.clone()).with_tag(from_tag))
            .to_addr(Address::new(channel_uri.clone()))
            .call_id(gb_sip_core::rand_string(24))
            .cseq(1, Method::Invite)
            .content_type("application/sdp")
            .contact(Address::new(server_uri))
            .generic_header(
                "Subject",
                format!("{}:{},{}:{}", channel.channel_id, stream_id, self.config.server_device_id, stream_id),
            )
            .body(sdp_body)
            .destination(destination)
            .build()
    }

    /// Spec §4.8's `SipStopTalk`: tear down engine-side resources first
    /// (best-effort), then BYE a push-type session on its original
    /// transport. Errors here are recorded on the stream, never returned.
    ///
    /// Whether the stream is then evicted from the catalog or kept around
    /// with `status = Stopped` is left ambiguous by the source this is
    /// modeled on (the deletion call there is commented out); this gateway
    /// makes it a config choice (`SessionConfig::evict_streams_on_bye`)
    /// rather than picking one silently.
    pub async fn sip_stop_talk(&self, stream_id: &str) -> Result<()> {
        if let Err(e) = self.media.close_streams(stream_id).await {
            warn!(stream_id, error = %e, "close_streams failed");
        }
        if let Err(e) = self.media.close_rtp_server(stream_id).await {
            warn!(stream_id, error = %e, "close_rtp_server failed");
        }

        let Some(mut stream) = self.get_stream(stream_id) else {
            return Ok(());
        };

        if stream.stream_type == StreamType::Push {
            self.bye_push_session(&mut stream).await;
        }

        if self.config.evict_streams_on_bye {
            self.streams.remove(stream_id);
            self.channel_live
                .remove_if(&stream.channel_id, |_, live_id| live_id == stream_id);
        } else {
            self.streams.insert(stream_id.to_string(), stream);
        }
        Ok(())
    }

    async fn bye_push_session(&self, stream: &mut Stream) {
        let Some(device) = self.active_devices.get(&stream.device_id) else {
            warn!(stream_id = stream.stream_id, "device offline, cannot send BYE");
            return;
        };
        let Some(device_addr) = device.source else { return };
        let Some(response) = stream.invite_response.clone() else {
            stream.status = StreamStatus::Stopped;
            stream.stop = true;
            return;
        };

        let bye = Request::from_response(Method::Bye, &response);
        let transport: Arc<dyn Transport> = if device.is_tcp() { self.tcp_transport.clone() } else { self.udp_transport.clone() };

        let result: Result<()> = async {
            let key = TransactionKey::for_request(&bye).ok_or_else(|| Error::Internal("BYE missing Via".into()))?;
            let tx = self.transactions.get_or_create(key, transport, device_addr, device.is_tcp());
            tx.request(bye).await?;
            let resp = tx.next_response().await?;
            if !resp.is_success() {
                warn!(stream_id = stream.stream_id, status = resp.status, "BYE rejected");
            }
            Ok(())
        }
        .await;

        if let Err(e) = result {
            warn!(stream_id = stream.stream_id, error = %e, "BYE exchange failed");
            stream.error = Some(e.to_string());
        }

        stream.status = StreamStatus::Stopped;
        stream.stop = true;
    }

    /// Reaps streams whose `Ext` has elapsed without renewal (spec §4.8:
    /// "Streams that never reach ACK are reaped when Ext elapses").
    pub async fn reap_expired(&self) {
        let now = now();
        let expired: Vec<String> = self
            .streams
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        for stream_id in expired {
            info!(stream_id, "reaping expired stream");
            if let Err(e) = self.sip_stop_talk(&stream_id).await {
                warn!(stream_id, error = %e, "failed to tear down expired stream");
            }
        }
    }

    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                orchestrator.reap_expired().await;
            }
        });
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
