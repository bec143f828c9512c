//! Transaction key derivation (spec §4.4): the top Via branch plus the
//! CSeq method, with the ACK special case RFC 3261 §17.1.1.3 describes —
//! an ACK to a non-2xx final response matches the original INVITE's key,
//! while an ACK to a 2xx response gets a key of its own.

use gb_sip_core::{Method, Request, Response};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionKey {
    branch: String,
    method: Method,
}

impl TransactionKey {
    pub fn new(branch: impl Into<String>, method: Method) -> Self {
        TransactionKey {
            branch: branch.into(),
            method,
        }
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Key under which an outbound request is tracked. A request always
    /// owns its Via, so this only returns `None` for a malformed request.
    pub fn for_request(req: &Request) -> Option<Self> {
        let via = req.via()?;
        let branch = via.branch()?.to_string();
        let matching_method = if req.method == Method::Ack {
            Method::Invite
        } else {
            req.method
        };
        Some(TransactionKey::new(branch, matching_method))
    }

    /// Key under which an inbound response is matched back to a transaction.
    pub fn for_response(resp: &Response) -> Option<Self> {
        let via = resp.via()?;
        let branch = via.branch()?.to_string();
        let cseq = resp.cseq()?;
        Some(TransactionKey::new(branch, cseq.method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gb_sip_core::{Header, Uri, Via};

    fn request_with_branch(method: Method, branch: &str) -> Request {
        let mut req = Request::new(method, Uri::new("34020000001320000001", "192.0.2.10"));
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.1", branch.to_string())));
        req
    }

    #[test]
    fn ack_matches_invite_key() {
        let invite = request_with_branch(Method::Invite, "z9hG4bK-abc");
        let ack = request_with_branch(Method::Ack, "z9hG4bK-abc");
        assert_eq!(
            TransactionKey::for_request(&invite),
            TransactionKey::for_request(&ack)
        );
    }

    #[test]
    fn different_branches_differ() {
        let a = request_with_branch(Method::Register, "z9hG4bK-1");
        let b = request_with_branch(Method::Register, "z9hG4bK-2");
        assert_ne!(TransactionKey::for_request(&a), TransactionKey::for_request(&b));
    }
}
