//! Errors local to message parsing/building. Kept separate from
//! `gb-infra::Error` so this crate has no dependency on the rest of the
//! workspace — it's the external-collaborator layer per spec §4.3.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SIP parse error: {0}")]
    Parse(String),
}
