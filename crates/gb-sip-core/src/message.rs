//! `Request`/`Response` message types and the serializer used for both
//! UDP datagrams and TCP framed sends.

use std::fmt::Write as _;
use std::net::SocketAddr;

use crate::header::{Address, CSeq, GenericHeader, Header, Via};
use crate::method::Method;
use crate::uri::Uri;

const SIP_VERSION: &str = "SIP/2.0";

/// A parsed or constructed SIP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub uri: Uri,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
    /// Where this message arrived from, or (for an outbound request) where
    /// it should be sent. Not part of the wire format.
    pub source: Option<SocketAddr>,
    pub destination: Option<SocketAddr>,
}

/// A parsed or constructed SIP response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<Header>,
    pub body: Vec<u8>,
    pub source: Option<SocketAddr>,
    pub destination: Option<SocketAddr>,
}

#[derive(Debug, Clone)]
pub enum Message {
    Request(Request),
    Response(Response),
}

macro_rules! header_accessors {
    () => {
        pub fn headers(&self) -> &[Header] {
            &self.headers
        }

        pub fn header(&self, name: &str) -> Option<&Header> {
            self.headers.iter().find(|h| h.name().eq_ignore_ascii_case(name))
        }

        pub fn get_headers(&self, name: &str) -> Vec<&Header> {
            self.headers
                .iter()
                .filter(|h| h.name().eq_ignore_ascii_case(name))
                .collect()
        }

        pub fn append_header(&mut self, header: Header) {
            self.headers.push(header);
        }

        pub fn via(&self) -> Option<&Via> {
            self.headers.iter().find_map(|h| match h {
                Header::Via(v) => Some(v),
                _ => None,
            })
        }

        pub fn from_header(&self) -> Option<&Address> {
            self.headers.iter().find_map(|h| match h {
                Header::From(a) => Some(a),
                _ => None,
            })
        }

        pub fn to_header(&self) -> Option<&Address> {
            self.headers.iter().find_map(|h| match h {
                Header::To(a) => Some(a),
                _ => None,
            })
        }

        pub fn to_header_mut(&mut self) -> Option<&mut Address> {
            self.headers.iter_mut().find_map(|h| match h {
                Header::To(a) => Some(a),
                _ => None,
            })
        }

        pub fn call_id(&self) -> Option<&str> {
            self.headers.iter().find_map(|h| match h {
                Header::CallId(s) => Some(s.as_str()),
                _ => None,
            })
        }

        pub fn cseq(&self) -> Option<CSeq> {
            self.headers.iter().find_map(|h| match h {
                Header::CSeq(c) => Some(*c),
                _ => None,
            })
        }

        pub fn content_type(&self) -> Option<&str> {
            self.headers.iter().find_map(|h| match h {
                Header::ContentType(s) => Some(s.as_str()),
                _ => None,
            })
        }

        pub fn content_length(&self) -> usize {
            self.headers
                .iter()
                .find_map(|h| match h {
                    Header::ContentLength(n) => Some(*n),
                    _ => None,
                })
                .unwrap_or(self.body.len())
        }
    };
}

impl Request {
    header_accessors!();

    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            headers: Vec::new(),
            body: Vec::new(),
            source: None,
            destination: None,
        }
    }

    /// Builds an `ACK`/`BYE` whose dialog headers (`Call-ID`, `From`/`To`
    /// tags, `CSeq` method) are copied from a prior final response, per
    /// spec §4.8 step 9 and §4.8's `SipStopTalk` BYE construction.
    pub fn from_response(method: Method, response: &Response) -> Self {
        let uri = response
            .to_header()
            .map(|a| a.uri.clone())
            .unwrap_or_else(|| Uri::new("unknown", "unknown"));
        let mut req = Request::new(method, uri.clone());
        if let Some(via) = response.via() {
            req.append_header(Header::Via(via.clone()));
        }
        if let Some(from) = response.from_header() {
            req.append_header(Header::From(from.clone()));
        }
        if let Some(to) = response.to_header() {
            req.append_header(Header::To(to.clone()));
        }
        if let Some(call_id) = response.call_id() {
            req.append_header(Header::CallId(call_id.to_string()));
        }
        let seq = response.cseq().map(|c| c.seq).unwrap_or(1);
        req.append_header(Header::CSeq(CSeq { seq, method }));
        req
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        let _ = writeln!(out, "{} {} {}\r", self.method, self.uri, SIP_VERSION);
        serialize_headers(&mut out, &self.headers, self.body.len());
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

impl Response {
    header_accessors!();

    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Response {
            status,
            reason: reason.into(),
            headers: Vec::new(),
            body: Vec::new(),
            source: None,
            destination: None,
        }
    }

    /// Builds a response that mirrors a request's dialog-identifying
    /// headers (Via, From, To, Call-ID, CSeq), per the server-side pattern
    /// used throughout §4.6/§4.7/§4.8 (`NewResponseFromRequest` in the
    /// original gateway).
    pub fn from_request(request: &Request, status: u16, reason: impl Into<String>) -> Self {
        let mut resp = Response::new(status, reason);
        if let Some(via) = request.via() {
            resp.append_header(Header::Via(via.clone()));
        }
        if let Some(from) = request.from_header() {
            resp.append_header(Header::From(from.clone()));
        }
        if let Some(to) = request.to_header() {
            resp.append_header(Header::To(to.clone()));
        }
        if let Some(call_id) = request.call_id() {
            resp.append_header(Header::CallId(call_id.to_string()));
        }
        if let Some(cseq) = request.cseq() {
            resp.append_header(Header::CSeq(cseq));
        }
        resp
    }

    pub fn is_final(&self) -> bool {
        self.status >= 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        let _ = writeln!(out, "{} {} {}\r", SIP_VERSION, self.status, self.reason);
        serialize_headers(&mut out, &self.headers, self.body.len());
        let mut bytes = out.into_bytes();
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn serialize_headers(out: &mut String, headers: &[Header], body_len: usize) {
    let mut wrote_content_length = false;
    for h in headers {
        if matches!(h, Header::ContentLength(_)) {
            wrote_content_length = true;
        }
        let _ = writeln!(out, "{}: {}\r", h.name(), h.value_string());
    }
    if !wrote_content_length {
        let _ = writeln!(out, "Content-Length: {body_len}\r");
    }
    let _ = write!(out, "\r\n");
}

impl Message {
    pub fn method(&self) -> Option<Method> {
        match self {
            Message::Request(r) => Some(r.method),
            Message::Response(_) => None,
        }
    }

    pub fn set_source(&mut self, addr: SocketAddr) {
        match self {
            Message::Request(r) => r.source = Some(addr),
            Message::Response(r) => r.source = Some(addr),
        }
    }

    pub fn set_destination(&mut self, addr: SocketAddr) {
        match self {
            Message::Request(r) => r.destination = Some(addr),
            Message::Response(r) => r.destination = Some(addr),
        }
    }
}

/// A catch-all header value accessor shared by the registrar and message
/// handler for headers without a typed representation.
pub fn generic_header_value<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers.iter().find_map(|h| match h {
        Header::Generic(GenericHeader { name: n, value }) if n.eq_ignore_ascii_case(name) => {
            Some(value.as_str())
        }
        _ => None,
    })
}
