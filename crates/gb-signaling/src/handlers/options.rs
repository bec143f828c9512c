//! OPTIONS handling (SPEC_FULL.md §9 supplemental feature): responds with
//! an `Allow` header enumerating the methods this gateway speaks. Grounded
//! on `examples/original_source/sip/handler.go`'s `handlerOptions`.

use gb_sip_core::{GenericHeader, Header, Request, Response};

use super::util::device_id_from_request;

pub fn handle(req: &Request) -> Response {
    if device_id_from_request(req).is_none() {
        return Response::from_request(req, 400, "Bad Request");
    }

    let mut resp = Response::from_request(req, 200, "OK");
    resp.append_header(Header::Generic(GenericHeader::new(
        "Allow",
        "REGISTER, MESSAGE, NOTIFY, BYE, OPTIONS, INFO, INVITE, ACK, CANCEL",
    )));
    resp
}
