//! Small shared helper for the handlers in this module.

use gb_sip_core::Request;

/// The device-id is the `From` URI's user part, the same field the
/// registrar reads (spec §4.6/§4.7: "parse the From user's device-id").
pub fn device_id_from_request(req: &Request) -> Option<String> {
    req.from_header().and_then(|addr| addr.uri.user.clone())
}
