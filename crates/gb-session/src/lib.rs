//! The session orchestrator: SSRC allocation, SDP/INVITE/ACK/BYE dialog
//! management, and the stream catalog (spec §4.8, component C9).

pub mod channel;
pub mod config;
pub mod orchestrator;
pub mod ssrc;
pub mod stream;

pub use channel::{Channel, ChannelDirectory, ChannelStatus, StreamType};
pub use config::SessionConfig;
pub use orchestrator::{Orchestrator, TalkRequest};
pub use ssrc::{stream_id_for_ssrc, SsrcAllocator};
pub use stream::{Stream, StreamStatus};
