//! The server dispatcher (spec §4.5, component C6): owns the method-handler
//! registry and routes every parsed message either to the transaction it
//! belongs to (responses) or to a per-method handler (requests), per
//! connection. Grounded on `examples/original_source/sip/s/server.go`'s
//! `handlerRequest`/`handlerResponse` pair, generalized so the same code
//! serves both the UDP and the per-TCP-connection event streams spec §5
//! requires to be independent of one another.

use std::sync::Arc;

use gb_registrar::{ActiveDevices, DeviceStore, Registrar};
use gb_session::{ChannelDirectory, Orchestrator};
use gb_sip_core::{Message, Method, Request, Response, ResponseBuilder};
use gb_sip_transport::{Transport, TransportEvent};
use gb_transaction::{TransactionKey, TransactionTable};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::handlers::{self, message::RecordingSink};

/// Everything the dispatcher needs to answer a request, grouped so
/// `Dispatcher::new` doesn't take a dozen bare arguments.
pub struct Dispatcher<S: DeviceStore + 'static, C: ChannelDirectory + 'static> {
    registrar: Arc<Registrar<S>>,
    channels: Arc<C>,
    orchestrator: Arc<Orchestrator<C>>,
    transactions: Arc<TransactionTable>,
    active_devices: Arc<ActiveDevices>,
    recording: Arc<dyn RecordingSink>,
}

impl<S: DeviceStore + 'static, C: ChannelDirectory + 'static> Dispatcher<S, C> {
    pub fn new(
        registrar: Arc<Registrar<S>>,
        channels: Arc<C>,
        orchestrator: Arc<Orchestrator<C>>,
        transactions: Arc<TransactionTable>,
        active_devices: Arc<ActiveDevices>,
        recording: Arc<dyn RecordingSink>,
    ) -> Arc<Self> {
        Arc::new(Dispatcher {
            registrar,
            channels,
            orchestrator,
            transactions,
            active_devices,
            recording,
        })
    }

    /// Consumes one transport's event stream until it closes. Each
    /// transport (the shared UDP socket, each accepted TCP connection) gets
    /// its own call to this so a slow handler on one never stalls another
    /// (spec §5: "independent dispatchers").
    pub fn run(self: &Arc<Self>, mut events: mpsc::Receiver<TransportEvent>, transport: Arc<dyn Transport>, reliable: bool) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TransportEvent::MessageReceived { message, .. } => {
                        dispatcher.route(message, transport.clone(), reliable).await;
                    }
                    TransportEvent::Error { error } => {
                        warn!(error, "transport error");
                    }
                    TransportEvent::Closed => break,
                }
            }
        });
    }

    async fn route(self: &Arc<Self>, message: Message, transport: Arc<dyn Transport>, reliable: bool) {
        match message {
            Message::Request(req) => self.clone().handle_request(req, transport, reliable).await,
            Message::Response(resp) => self.transactions.route_response(resp).await,
        }
    }

    async fn handle_request(self: Arc<Self>, req: Request, transport: Arc<dyn Transport>, reliable: bool) {
        let Some(peer) = req.source else {
            warn!("request with no source address, dropping");
            return;
        };
        let Some(key) = TransactionKey::for_request(&req) else {
            warn!(method = %req.method, "request missing Via branch, dropping");
            return;
        };

        let tx = self.transactions.get_or_create(key, transport, peer, reliable);
        info!(method = %req.method, %peer, tx_key = tx.key().branch(), "dispatching SIP request");

        tokio::spawn(async move {
            let response = match req.method {
                Method::Register => self.registrar.handle_register(&req, peer).await,
                Method::Message => Some(
                    handlers::message::handle(
                        &req,
                        self.registrar.store().as_ref(),
                        self.channels.as_ref(),
                        &self.active_devices,
                        self.registrar.notifier(),
                        self.recording.as_ref(),
                    )
                    .await,
                ),
                Method::Notify => Some(handlers::notify::handle(&req, &self.active_devices)),
                Method::Bye => Some(handlers::bye::handle(&req, &self.active_devices, &self.orchestrator).await),
                Method::Options => Some(handlers::options::handle(&req)),
                _ => Some(method_not_allowed(&req)),
            };

            if let Some(response) = response {
                if let Err(e) = tx.respond(response).await {
                    warn!(error = %e, "failed to send response");
                }
            }
        });
    }
}

fn method_not_allowed(req: &Request) -> Response {
    ResponseBuilder::from_request(req, 405, "Method Not Allowed")
        .generic_header("Allow", "REGISTER, MESSAGE, NOTIFY, BYE, OPTIONS")
        .build()
}
