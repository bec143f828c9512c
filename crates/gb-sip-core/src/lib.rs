//! SIP message types, parser and builder for the GB28181 subset of
//! RFC 3261 this gateway speaks. This is the "external collaborator" named
//! in spec §4.3 — deliberately small, not a general-purpose SIP stack.

pub mod auth;
pub mod builder;
pub mod error;
pub mod header;
pub mod message;
pub mod method;
pub mod parser;
pub mod sdp;
pub mod uri;

pub use builder::{RequestBuilder, ResponseBuilder};
pub use error::Error;
pub use header::{Address, GenericHeader, Header, Via, CSeq};
pub use message::{Message, Request, Response};
pub use method::Method;
pub use parser::parse_message;
pub use uri::Uri;

/// Generates an RFC 3261 `z9hG4bK`-prefixed branch parameter.
pub fn generate_branch() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let suffix: String = (0..16)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap())
        .collect();
    format!("z9hG4bK{suffix}")
}

/// Generates a random alphanumeric string of the given length, used for
/// dialog tags and digest nonces.
pub fn rand_string(len: usize) -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| std::char::from_digit(rng.gen_range(0..36), 36).unwrap())
        .collect()
}
