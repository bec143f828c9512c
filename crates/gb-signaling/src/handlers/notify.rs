//! NOTIFY handling (SPEC_FULL.md §9 supplemental feature): a
//! recognized-but-largely-stub method in the original — the sender must be
//! an active device, its `active_at` is refreshed, and the request is
//! 200'd. Body interpretation is left as future work, matching the
//! original's unfinished `handlerNotify`.

use gb_registrar::ActiveDevices;
use gb_sip_core::{Request, Response};
use tracing::warn;

use super::util::device_id_from_request;

pub fn handle(req: &Request, active_devices: &ActiveDevices) -> Response {
    let Some(device_id) = device_id_from_request(req) else {
        return Response::from_request(req, 400, "Bad Request");
    };

    if active_devices.get(&device_id).is_none() {
        warn!(device_id, "NOTIFY from a device that is not active");
        return Response::from_request(req, 401, "Unauthorized");
    }

    active_devices.touch(&device_id, chrono::Utc::now().timestamp());
    Response::from_request(req, 200, "OK")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_registrar::Device;
    use gb_sip_core::{Address, Header, Method, Uri, Via};

    fn notify_request(device_id: &str) -> Request {
        let uri = Uri::new(device_id, "192.0.2.50");
        let mut req = Request::new(Method::Notify, uri.clone());
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.50", "z9hG4bK-1".to_string())));
        req.append_header(Header::From(Address::new(uri)));
        req
    }

    #[test]
    fn inactive_device_is_rejected() {
        let active = ActiveDevices::new();
        let resp = handle(&notify_request("34020000001110000001"), &active);
        assert_eq!(resp.status, 401);
    }

    #[test]
    fn active_device_is_accepted_and_touched() {
        let active = ActiveDevices::new();
        active.store(Device::new("34020000001110000001", "secret"));
        let resp = handle(&notify_request("34020000001110000001"), &active);
        assert_eq!(resp.status, 200);
        assert!(active.get("34020000001110000001").unwrap().active_at.is_some());
    }
}
