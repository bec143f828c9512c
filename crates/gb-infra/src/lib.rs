//! Ambient infrastructure shared by every GB28181 gateway crate.
//!
//! This crate carries the concerns that don't belong to any single SIP
//! component: the unified error type, wire-level logging helpers, and
//! configuration loading. Collecting them here keeps `gb-sip-transport`,
//! `gb-registrar`, `gb-session` and friends free of duplicated boilerplate.

pub mod config;
pub mod errors;
pub mod logging;

pub use config::GatewayConfig;
pub use errors::{Error, Result};
