//! RFC 2617 Digest authentication parameters and the MD5 computation spec
//! §4.6 describes: `HA1 = MD5(username:realm:password)`,
//! `HA2 = MD5(method:uri)`, and the final response hash, with or without
//! `qop=auth`.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

/// The parsed contents of a `WWW-Authenticate`/`Authorization` header
/// value, e.g. `Digest nonce="...", algorithm=MD5, realm="...", qop="auth"`.
#[derive(Debug, Clone, Default)]
pub struct DigestParams {
    fields: BTreeMap<String, String>,
}

impl DigestParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|s| s.as_str())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Parses a header value of the form `Digest key="value", key=value, ...`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        let value = value
            .strip_prefix("Digest")
            .or_else(|| value.strip_prefix("digest"))
            .unwrap_or(value)
            .trim();

        let mut fields = BTreeMap::new();
        for part in split_params(value) {
            let Some((k, v)) = part.split_once('=') else {
                continue;
            };
            let k = k.trim().to_ascii_lowercase();
            let v = v.trim().trim_matches('"').to_string();
            fields.insert(k, v);
        }
        DigestParams { fields }
    }

    /// Serializes back into a `WWW-Authenticate` header value, matching the
    /// exact shape spec §4.6 step 1 mandates:
    /// `Digest nonce=<32-random>, algorithm=MD5, realm=<region>, qop="auth"`.
    pub fn to_www_authenticate(nonce: &str, realm: &str) -> String {
        format!(r#"Digest nonce="{nonce}", algorithm=MD5, realm="{realm}", qop="auth""#)
    }

    /// Computes the expected digest response using the stored credentials.
    /// `qop=auth` folds `nc` and `cnonce` into the hash; its absence falls
    /// back to the simpler `MD5(HA1:nonce:HA2)` form.
    pub fn compute_response(&self, username: &str, realm: &str, password: &str, method: &str) -> String {
        let ha1 = md5_hex(&format!("{username}:{realm}:{password}"));
        let uri = self.get("uri").unwrap_or_default();
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nonce = self.get("nonce").unwrap_or_default();

        if let Some(qop) = self.get("qop") {
            let nc = self.get("nc").unwrap_or_default();
            let cnonce = self.get("cnonce").unwrap_or_default();
            md5_hex(&format!("{ha1}:{nonce}:{nc}:{cnonce}:{qop}:{ha2}"))
        } else {
            md5_hex(&format!("{ha1}:{nonce}:{ha2}"))
        }
    }
}

fn split_params(value: &str) -> Vec<&str> {
    // Split on commas that aren't inside a quoted string.
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generates a random 32-character hex nonce, as required by spec §4.6.
pub fn generate_nonce() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| std::char::from_digit(rng.gen_range(0..16), 16).unwrap())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_known_digest() {
        // RFC 2617 worked example, adapted: verifies HA1/HA2/response compose
        // in the right order rather than matching an external fixture.
        let mut params = DigestParams::default();
        params.set("nonce", "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        params.set("uri", "sip:3402000000@192.168.1.1:5060");
        params.set("qop", "auth");
        params.set("nc", "00000001");
        params.set("cnonce", "0a4f113b");

        let response = params.compute_response("34020000001320000001", "3402000000", "12345678", "REGISTER");
        assert_eq!(response.len(), 32);

        // Any single-field corruption changes the hash (spec §8 digest
        // correctness invariant).
        let mut corrupted = params.clone();
        corrupted.set("nc", "00000002");
        assert_ne!(response, corrupted.compute_response("34020000001320000001", "3402000000", "12345678", "REGISTER"));
    }

    #[test]
    fn parses_authorization_header() {
        let raw = r#"Digest username="34020000001320000001", realm="3402000000", nonce="abc", uri="sip:x@y", response="def", qop=auth, nc=00000001, cnonce="123""#;
        let params = DigestParams::parse(raw);
        assert_eq!(params.get("username"), Some("34020000001320000001"));
        assert_eq!(params.get("qop"), Some("auth"));
    }
}
