//! Turns a framed byte slice plus a source address into a typed [`Message`].
//!
//! This is the collaborator spec §4.3 describes: its only real obligation is
//! a round-trip property (`serialize(parse(m))` is byte-equivalent modulo
//! whitespace/folding) for the headers this gateway understands; anything
//! else passes through untouched as a [`GenericHeader`].

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::header::{Address, CSeq, GenericHeader, Header, Via};
use crate::message::{Message, Request, Response};
use crate::method::Method;
use crate::uri::Uri;
use crate::Error;

pub fn parse_message(raw: &[u8], source: SocketAddr) -> Result<Message, Error> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::Parse(format!("message is not valid UTF-8: {e}")))?;

    let header_end = text
        .find("\r\n\r\n")
        .ok_or_else(|| Error::Parse("missing header terminator".to_string()))?;
    let header_block = &text[..header_end];
    let body = raw[header_end + 4..].to_vec();

    let mut lines = header_block.split("\r\n");
    let first_line = lines
        .next()
        .ok_or_else(|| Error::Parse("empty message".to_string()))?;

    let headers = parse_headers(lines)?;

    let mut message = if let Some(request) = try_parse_request_line(first_line, headers.clone(), body.clone())? {
        Message::Request(request)
    } else if let Some(response) = try_parse_response_line(first_line, headers, body)? {
        Message::Response(response)
    } else {
        return Err(Error::Parse(format!("unrecognized start line: {first_line}")));
    };

    message.set_source(source);
    Ok(message)
}

fn try_parse_request_line(
    line: &str,
    headers: Vec<Header>,
    body: Vec<u8>,
) -> Result<Option<Request>, Error> {
    let mut parts = line.splitn(3, ' ');
    let (Some(method_str), Some(uri_str), Some(version)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Ok(None);
    };
    if !version.to_uppercase().starts_with("SIP/") {
        return Ok(None);
    }
    let Ok(method) = Method::from_str(method_str) else {
        return Ok(None);
    };
    let uri = Uri::parse(uri_str)?;
    Ok(Some(Request {
        method,
        uri,
        headers,
        body,
        source: None,
        destination: None,
    }))
}

fn try_parse_response_line(
    line: &str,
    headers: Vec<Header>,
    body: Vec<u8>,
) -> Result<Option<Response>, Error> {
    if !line.to_uppercase().starts_with("SIP/") {
        return Ok(None);
    }
    let mut parts = line.splitn(3, ' ');
    let (Some(_version), Some(status_str), reason) = (parts.next(), parts.next(), parts.next())
    else {
        return Ok(None);
    };
    let Ok(status) = status_str.parse::<u16>() else {
        return Ok(None);
    };
    Ok(Some(Response {
        status,
        reason: reason.unwrap_or("").to_string(),
        headers,
        body,
        source: None,
        destination: None,
    }))
}

fn parse_headers<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<Header>, Error> {
    let mut headers = Vec::new();
    // Unfold header continuation lines (leading whitespace) before
    // splitting on ':'.
    let mut joined: Vec<String> = Vec::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if (line.starts_with(' ') || line.starts_with('\t')) && !joined.is_empty() {
            let last = joined.last_mut().unwrap();
            last.push(' ');
            last.push_str(line.trim_start());
        } else {
            joined.push(line.to_string());
        }
    }

    for line in joined {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        let value = value.trim();
        headers.push(parse_header(name, value)?);
    }
    Ok(headers)
}

fn parse_header(name: &str, value: &str) -> Result<Header, Error> {
    let lower = name.to_ascii_lowercase();
    Ok(match lower.as_str() {
        "via" | "v" => Header::Via(parse_via(value)?),
        "from" | "f" => Header::From(parse_address(value)?),
        "to" | "t" => Header::To(parse_address(value)?),
        "call-id" | "i" => Header::CallId(value.to_string()),
        "cseq" => Header::CSeq(parse_cseq(value)?),
        "content-type" | "c" => Header::ContentType(value.to_string()),
        "content-length" | "l" => Header::ContentLength(
            value
                .parse()
                .map_err(|_| Error::Parse(format!("bad Content-Length: {value}")))?,
        ),
        "max-forwards" => Header::MaxForwards(
            value
                .parse()
                .map_err(|_| Error::Parse(format!("bad Max-Forwards: {value}")))?,
        ),
        "contact" | "m" => Header::Contact(parse_address(value)?),
        _ => Header::Generic(GenericHeader::new(name, value)),
    })
}

fn parse_via(value: &str) -> Result<Via, Error> {
    // "SIP/2.0/UDP host:port;branch=...;rport"
    let (proto, rest) = value
        .split_once(' ')
        .ok_or_else(|| Error::Parse(format!("malformed Via: {value}")))?;
    let transport = proto
        .rsplit('/')
        .next()
        .ok_or_else(|| Error::Parse(format!("malformed Via protocol: {proto}")))?
        .to_string();

    let mut segments = rest.split(';');
    let host_port = segments.next().unwrap_or("").trim();
    let (host, port) = match host_port.split_once(':') {
        Some((h, p)) => (h.to_string(), p.parse::<u16>().ok()),
        None => (host_port.to_string(), None),
    };
    let mut params = BTreeMap::new();
    for seg in segments {
        let seg = seg.trim();
        if seg.is_empty() {
            continue;
        }
        match seg.split_once('=') {
            Some((k, v)) => {
                params.insert(k.to_string(), Some(v.to_string()));
            }
            None => {
                params.insert(seg.to_string(), None);
            }
        }
    }
    Ok(Via {
        transport,
        host,
        port,
        params,
    })
}

fn parse_address(value: &str) -> Result<Address, Error> {
    let value = value.trim();
    let (display_and_uri, param_str) = match value.find(';') {
        Some(idx) => (&value[..idx], Some(&value[idx + 1..])),
        None => (value, None),
    };
    let display_and_uri = display_and_uri.trim();

    let (display_name, uri_part) = if let Some(start) = display_and_uri.find('<') {
        let name = display_and_uri[..start].trim().trim_matches('"');
        let end = display_and_uri
            .find('>')
            .ok_or_else(|| Error::Parse(format!("unterminated address URI: {value}")))?;
        let name = if name.is_empty() { None } else { Some(name.to_string()) };
        (name, &display_and_uri[start + 1..end])
    } else {
        (None, display_and_uri)
    };

    let uri = Uri::parse(uri_part)?;
    let mut params = BTreeMap::new();
    if let Some(param_str) = param_str {
        for seg in param_str.split(';') {
            let seg = seg.trim();
            if seg.is_empty() {
                continue;
            }
            match seg.split_once('=') {
                Some((k, v)) => {
                    params.insert(k.to_string(), Some(v.to_string()));
                }
                None => {
                    params.insert(seg.to_string(), None);
                }
            }
        }
    }

    Ok(Address {
        display_name,
        uri,
        params,
    })
}

fn parse_cseq(value: &str) -> Result<CSeq, Error> {
    let (seq_str, method_str) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| Error::Parse(format!("malformed CSeq: {value}")))?;
    let seq = seq_str
        .parse::<u32>()
        .map_err(|_| Error::Parse(format!("bad CSeq sequence: {seq_str}")))?;
    let method = Method::from_str(method_str.trim())
        .map_err(|_| Error::Parse(format!("unknown CSeq method: {method_str}")))?;
    Ok(CSeq { seq, method })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:5060".parse().unwrap()
    }

    #[test]
    fn parses_register_request() {
        let raw = b"REGISTER sip:3402000000@192.168.1.1:5060 SIP/2.0\r\n\
Via: SIP/2.0/UDP 192.168.1.100:5060;branch=z9hG4bK123\r\n\
From: <sip:34020000001320000001@3402000000>;tag=abc\r\n\
To: <sip:34020000001320000001@3402000000>\r\n\
Call-ID: call-1\r\n\
CSeq: 1 REGISTER\r\n\
Content-Length: 0\r\n\r\n";
        let msg = parse_message(raw, addr()).unwrap();
        match msg {
            Message::Request(req) => {
                assert_eq!(req.method, Method::Register);
                assert_eq!(req.call_id(), Some("call-1"));
                assert_eq!(req.via().unwrap().branch(), Some("z9hG4bK123"));
            }
            _ => panic!("expected request"),
        }
    }

    #[test]
    fn parses_response() {
        let raw = b"SIP/2.0 200 OK\r\nCSeq: 1 REGISTER\r\nContent-Length: 0\r\n\r\n";
        let msg = parse_message(raw, addr()).unwrap();
        match msg {
            Message::Response(resp) => assert_eq!(resp.status, 200),
            _ => panic!("expected response"),
        }
    }
}
