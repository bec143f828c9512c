//! Splits a growing TCP byte stream into whole SIP messages.
//!
//! TCP is byte-oriented: a naive "one read = one message" loop either
//! deadlocks waiting for more bytes than the peer ever sends in one write,
//! or silently splits a message across two reads. This module is the pure
//! function spec §4.2 describes, property-tested for the round-trip and
//! resync invariants of spec §8.

const METHODS: &[&str] = &[
    "REGISTER", "INVITE", "ACK", "CANCEL", "BYE", "OPTIONS", "INFO", "PRACK", "UPDATE", "REFER",
    "NOTIFY", "SUBSCRIBE", "MESSAGE",
];

/// Attempts to extract one whole SIP message from the front of `buf`.
///
/// Returns `(Some(message), remainder)` when a complete message was found,
/// or `(None, buf)` (as a owned copy) when more bytes are needed.
pub fn extract_message(buf: &[u8]) -> (Option<Vec<u8>>, Vec<u8>) {
    let mut cursor = buf;

    loop {
        let Some(header_end_rel) = find_crlfcrlf(cursor) else {
            return (None, cursor.to_vec());
        };

        // Step 2: a leading empty separator is a device keep-alive; drop it
        // and keep scanning.
        if header_end_rel == 0 {
            cursor = &cursor[4..];
            if cursor.is_empty() {
                return (None, cursor.to_vec());
            }
            continue;
        }

        let header_block = &cursor[..header_end_rel];
        let header_end = header_end_rel + 4;

        if !is_valid_header_block(header_block) {
            // Step 3: not a recognizable SIP start line; discard through the
            // terminator and resync on the remainder.
            cursor = &cursor[header_end..];
            if cursor.is_empty() {
                return (None, cursor.to_vec());
            }
            continue;
        }

        let content_length = parse_content_length(header_block);
        let total = header_end + content_length;

        if cursor.len() < total {
            return (None, cursor.to_vec());
        }

        let message = cursor[..total].to_vec();
        let remainder = cursor[total..].to_vec();
        return (Some(message), remainder);
    }
}

fn find_crlfcrlf(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn is_valid_header_block(header_block: &[u8]) -> bool {
    let Ok(text) = std::str::from_utf8(header_block) else {
        return false;
    };
    let Some(first_line) = text.split("\r\n").next() else {
        return false;
    };
    let first_line = first_line.trim();
    if first_line.is_empty() {
        return false;
    }

    let parts: Vec<&str> = first_line.split_whitespace().collect();
    if parts.len() < 3 {
        return false;
    }

    let upper_version_request = parts[2].to_uppercase();
    let upper_version_response = parts[0].to_uppercase();

    let looks_like_request =
        METHODS.contains(&parts[0].to_uppercase().as_str()) && upper_version_request.starts_with("SIP/");
    let looks_like_response =
        upper_version_response.starts_with("SIP/") && parts[1].chars().all(|c| c.is_ascii_digit());

    looks_like_request || looks_like_response
}

fn parse_content_length(header_block: &[u8]) -> usize {
    let Ok(text) = std::str::from_utf8(header_block) else {
        return 0;
    };
    for line in text.split("\r\n") {
        let line = line.trim();
        let lower = line.to_ascii_lowercase();
        let value = if let Some(v) = lower.strip_prefix("content-length:") {
            Some(v)
        } else if let Some(v) = lower.strip_prefix("l:") {
            Some(v)
        } else {
            None
        };
        if let Some(value) = value {
            if let Ok(n) = value.trim().parse::<usize>() {
                return n;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_message(body_len: usize) -> Vec<u8> {
        let body = vec![b'a'; body_len];
        let mut msg = format!(
            "REGISTER sip:34020000002000000001@192.0.2.1 SIP/2.0\r\n\
CSeq: 1 REGISTER\r\n\
Content-Length: {body_len}\r\n\r\n"
        )
        .into_bytes();
        msg.extend_from_slice(&body);
        msg
    }

    #[test]
    fn extracts_single_message_literal() {
        let raw = b"REGISTER sip:34020000002000000001@192.0.2.1 SIP/2.0\r\nCSeq: 1 REGISTER\r\nContent-Length: 0\r\n\r\n";
        let (msg, rest) = extract_message(raw);
        assert_eq!(msg.unwrap(), raw.to_vec());
        assert!(rest.is_empty());
    }

    #[test]
    fn extracts_two_concatenated_messages() {
        let raw = b"REGISTER sip:34020000002000000001@192.0.2.1 SIP/2.0\r\nCSeq: 1 REGISTER\r\nContent-Length: 0\r\n\r\n";
        let mut both = raw.to_vec();
        both.extend_from_slice(raw);

        let (first, rest) = extract_message(&both);
        assert_eq!(first.unwrap(), raw.to_vec());
        let (second, rest2) = extract_message(&rest);
        assert_eq!(second.unwrap(), raw.to_vec());
        assert!(rest2.is_empty());
    }

    #[test]
    fn drops_leading_empty_separator() {
        let raw = b"\r\n\r\nREGISTER sip:34020000002000000001@192.0.2.1 SIP/2.0\r\nCSeq: 1 REGISTER\r\nContent-Length: 0\r\n\r\n";
        let (msg, rest) = extract_message(raw);
        assert_eq!(
            msg.unwrap(),
            b"REGISTER sip:34020000002000000001@192.0.2.1 SIP/2.0\r\nCSeq: 1 REGISTER\r\nContent-Length: 0\r\n\r\n".to_vec()
        );
        assert!(rest.is_empty());
    }

    #[test]
    fn waits_for_more_bytes_on_incomplete_body() {
        let full = sample_message(10);
        let (head, _) = full.split_at(full.len() - 3);
        let (msg, rest) = extract_message(head);
        assert!(msg.is_none());
        assert_eq!(rest, head.to_vec());
    }

    #[test]
    fn garbage_prefix_is_skipped_without_corrupting_following_message() {
        let good = sample_message(0);
        let mut buf = b"NOTAMETHOD garbage SIP/2.0\r\nX: 1\r\n\r\n".to_vec();
        buf.extend_from_slice(&good);
        let (msg, rest) = extract_message(&buf);
        assert_eq!(msg.unwrap(), good);
        assert!(rest.is_empty());
    }

    proptest! {
        #[test]
        fn round_trip_arbitrary_splits(body_len in 0usize..64, split in 0usize..200) {
            let msg = sample_message(body_len);
            let mut combined = msg.clone();
            combined.extend_from_slice(&msg);
            let split = split.min(combined.len());
            let (first_chunk, second_chunk) = combined.split_at(split);

            // Feed the first chunk, then the rest, accumulating whatever the
            // framer returns; it must yield exactly the two messages in order
            // regardless of where the split landed.
            let mut buf = first_chunk.to_vec();
            let mut extracted = Vec::new();
            loop {
                let (m, rest) = extract_message(&buf);
                match m {
                    Some(m) => { extracted.push(m); buf = rest; }
                    None => break,
                }
            }
            buf.extend_from_slice(second_chunk);
            loop {
                let (m, rest) = extract_message(&buf);
                match m {
                    Some(m) => { extracted.push(m); buf = rest; }
                    None => break,
                }
            }
            prop_assert_eq!(extracted, vec![msg.clone(), msg]);
            prop_assert!(buf.is_empty());
        }
    }
}
