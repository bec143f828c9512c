//! Fluent builders for constructing requests and responses, mirroring the
//! header-builder pattern used throughout the upstream SIP stack this
//! gateway is descended from. Outbound request construction (the INVITE in
//! `gb_session::Orchestrator::build_invite`, the DeviceInfo query in
//! `gb_signaling::querier`) goes through `RequestBuilder` rather than
//! `Request::new` plus a run of `append_header` calls.

use crate::header::{Address, CSeq, GenericHeader, Header, Via};
use crate::message::{Request, Response};
use crate::method::Method;
use crate::uri::Uri;

pub struct RequestBuilder {
    request: Request,
}

impl RequestBuilder {
    pub fn new(method: Method, uri: Uri) -> Self {
        RequestBuilder {
            request: Request::new(method, uri),
        }
    }

    pub fn via(mut self, via: Via) -> Self {
        self.request.append_header(Header::Via(via));
        self
    }

    pub fn from_addr(mut self, addr: Address) -> Self {
        self.request.append_header(Header::From(addr));
        self
    }

    pub fn to_addr(mut self, addr: Address) -> Self {
        self.request.append_header(Header::To(addr));
        self
    }

    pub fn call_id(mut self, call_id: impl Into<String>) -> Self {
        self.request.append_header(Header::CallId(call_id.into()));
        self
    }

    pub fn cseq(mut self, seq: u32, method: Method) -> Self {
        self.request.append_header(Header::CSeq(CSeq { seq, method }));
        self
    }

    pub fn max_forwards(mut self, n: u32) -> Self {
        self.request.append_header(Header::MaxForwards(n));
        self
    }

    pub fn contact(mut self, addr: Address) -> Self {
        self.request.append_header(Header::Contact(addr));
        self
    }

    pub fn content_type(mut self, ct: impl Into<String>) -> Self {
        self.request.append_header(Header::ContentType(ct.into()));
        self
    }

    pub fn generic_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request
            .append_header(Header::Generic(GenericHeader::new(name, value)));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.request.body = body;
        self
    }

    pub fn destination(mut self, addr: std::net::SocketAddr) -> Self {
        self.request.destination = Some(addr);
        self
    }

    pub fn build(self) -> Request {
        self.request
    }
}

pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        ResponseBuilder {
            response: Response::new(status, reason),
        }
    }

    pub fn from_request(request: &Request, status: u16, reason: impl Into<String>) -> Self {
        ResponseBuilder {
            response: Response::from_request(request, status, reason),
        }
    }

    pub fn generic_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.response
            .append_header(Header::Generic(GenericHeader::new(name, value)));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.response.body = body;
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}
