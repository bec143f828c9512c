//! A minimal SIP URI: `sip:user@host:port;params`.
//!
//! GB28181 devices only ever exchange `sip:` URIs over plain UDP/TCP, so this
//! intentionally doesn't cover `sips:`, `tel:`, or the full RFC 3261
//! parameter/header grammar.

use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    pub scheme: String,
    pub user: Option<String>,
    pub host: String,
    pub port: Option<u16>,
    pub params: BTreeMap<String, Option<String>>,
}

impl Uri {
    pub fn new(user: impl Into<String>, host: impl Into<String>) -> Self {
        Uri {
            scheme: "sip".to_string(),
            user: Some(user.into()),
            host: host.into(),
            port: None,
            params: BTreeMap::new(),
        }
    }

    pub fn parse(s: &str) -> Result<Self, crate::Error> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once(':')
            .ok_or_else(|| crate::Error::Parse(format!("URI missing scheme: {s}")))?;

        // Strip any trailing header/param block we don't model; keep the
        // user@host[:port] portion plus ';'-separated params.
        let rest = rest.trim_start_matches("//");
        let (authority_and_params, _headers) = match rest.split_once('?') {
            Some((a, h)) => (a, Some(h)),
            None => (rest, None),
        };
        let mut parts = authority_and_params.split(';');
        let authority = parts.next().unwrap_or("");
        let mut params = BTreeMap::new();
        for p in parts {
            if p.is_empty() {
                continue;
            }
            match p.split_once('=') {
                Some((k, v)) => {
                    params.insert(k.to_string(), Some(v.to_string()));
                }
                None => {
                    params.insert(p.to_string(), None);
                }
            }
        }

        let (user, host_port) = match authority.split_once('@') {
            Some((u, hp)) => (Some(u.to_string()), hp),
            None => (None, authority),
        };
        let (host, port) = match host_port.split_once(':') {
            Some((h, p)) => (
                h.to_string(),
                Some(
                    p.parse::<u16>()
                        .map_err(|_| crate::Error::Parse(format!("bad port in URI: {s}")))?,
                ),
            ),
            None => (host_port.to_string(), None),
        };

        Ok(Uri {
            scheme: scheme.to_string(),
            user,
            host,
            port,
            params,
        })
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{user}@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        for (k, v) in &self.params {
            match v {
                Some(v) => write!(f, ";{k}={v}")?,
                None => write!(f, ";{k}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_simple_uri() {
        let uri = Uri::parse("sip:34020000002000000001@192.168.1.1:5060").unwrap();
        assert_eq!(uri.user.as_deref(), Some("34020000002000000001"));
        assert_eq!(uri.host, "192.168.1.1");
        assert_eq!(uri.port, Some(5060));
    }

    #[test]
    fn parses_params() {
        let uri = Uri::parse("sip:bob@example.com;transport=tcp").unwrap();
        assert_eq!(uri.params.get("transport"), Some(&Some("tcp".to_string())));
    }
}
