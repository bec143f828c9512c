//! REGISTER handling (spec §4.6, component C7): challenge unauthenticated
//! requests, verify digest responses, and promote a device to active on
//! success. Grounded on `examples/original_source/sip/handler.go`'s
//! `handlerRegister`.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use gb_sip_core::auth::{generate_nonce, DigestParams};
use gb_sip_core::message::generic_header_value;
use gb_sip_core::{Request, Response, ResponseBuilder};
use gb_notify::{devices_register, devices_unknown, Notifier};
use tracing::{info, warn};

use crate::active::ActiveDevices;
use crate::device::{Device, DeviceStore};

/// Called after a device completes its first successful REGISTER, to kick
/// off the DeviceInfo re-query the original does with `go sipDeviceInfo(...)`.
/// A separate trait keeps this crate from depending on the signaling layer
/// that actually knows how to send an outbound SIP request.
#[async_trait]
pub trait DeviceInfoQuerier: Send + Sync {
    async fn query_device_info(&self, device: &Device);
}

pub struct Registrar<S> {
    store: Arc<S>,
    active: Arc<ActiveDevices>,
    notifier: Notifier,
    querier: Arc<dyn DeviceInfoQuerier>,
    realm: String,
}

impl<S: DeviceStore + 'static> Registrar<S> {
    pub fn new(
        store: Arc<S>,
        active: Arc<ActiveDevices>,
        notifier: Notifier,
        querier: Arc<dyn DeviceInfoQuerier>,
        realm: impl Into<String>,
    ) -> Self {
        Registrar {
            store,
            active,
            notifier,
            querier,
            realm: realm.into(),
        }
    }

    pub fn active_devices(&self) -> &ActiveDevices {
        &self.active
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Builds the response to a REGISTER request; spec §4.6 steps 1-2. Never
    /// returns an error — every branch has a defined SIP response, even the
    /// "respond nothing, let the client retry" branch (`None`).
    pub async fn handle_register(&self, req: &Request, source: SocketAddr) -> Option<Response> {
        let device_id = from_user(req)?;

        match generic_header_value(req.headers(), "Authorization") {
            None => Some(self.challenge_unauthenticated(req, &device_id).await),
            Some(auth_value) => self.verify_authenticated(req, &device_id, source, auth_value).await,
        }
    }

    /// Spec §4.6 step 1: an id absent from the persistent store gets a bare
    /// `401` with no `WWW-Authenticate` challenge (there's no password to
    /// challenge against); a pre-provisioned device gets the usual digest
    /// challenge.
    async fn challenge_unauthenticated(&self, req: &Request, device_id: &str) -> Response {
        match self.store.get(device_id).await {
            Ok(None) => {
                self.notifier.spawn_notify(devices_unknown(device_id, &req.uri.to_string()));
                Response::from_request(req, 401, "Unauthorized")
            }
            Ok(Some(_)) => self.unauthorized_with_challenge(req),
            Err(e) => {
                warn!(device_id, error = %e, "device store lookup failed");
                self.unauthorized_with_challenge(req)
            }
        }
    }

    async fn verify_authenticated(
        &self,
        req: &Request,
        device_id: &str,
        source: SocketAddr,
        auth_value: &str,
    ) -> Option<Response> {
        let device = match self.store.get(device_id).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                self.notifier.spawn_notify(devices_unknown(device_id, &req.uri.to_string()));
                return None;
            }
            Err(e) => {
                warn!(device_id, error = %e, "device store lookup failed");
                return None;
            }
        };

        let params = DigestParams::parse(auth_value);
        let expected = params.compute_response(device_id, &self.realm, &device.password, req.method.as_str());
        let Some(provided) = params.get("response") else {
            return Some(self.unauthorized_with_challenge(req));
        };

        if provided != expected {
            return Some(self.unauthorized_with_challenge(req));
        }

        let mut device = device;
        device.source = Some(source);
        device.registered = true;
        self.active.store(device.clone());
        if let Err(e) = self.store.mark_registered(device_id).await {
            warn!(device_id, error = %e, "failed to persist registration");
        }

        info!(device_id, "device registered");
        self.notifier.spawn_notify(devices_register(&device.device_id, &device.name));
        let querier = self.querier.clone();
        let notified_device = device.clone();
        tokio::spawn(async move {
            querier.query_device_info(&notified_device).await;
        });

        Some(Response::from_request(req, 200, "OK"))
    }

    fn unauthorized_with_challenge(&self, req: &Request) -> Response {
        let nonce = generate_nonce();
        ResponseBuilder::from_request(req, 401, "Unauthorized")
            .generic_header("WWW-Authenticate", DigestParams::to_www_authenticate(&nonce, &self.realm))
            .build()
    }
}

fn from_user(req: &Request) -> Option<String> {
    req.from_header().map(|addr| addr.uri.user.clone().unwrap_or_default())
}
