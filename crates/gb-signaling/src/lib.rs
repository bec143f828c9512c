//! The server dispatcher and the inbound SIP method handlers it routes to
//! (spec §4.5 component C6, §4.7 component C8): REGISTER goes to
//! `gb-registrar`, MESSAGE/NOTIFY/BYE/OPTIONS are handled here.

pub mod dispatcher;
pub mod handlers;
pub mod querier;

pub use dispatcher::Dispatcher;
pub use handlers::message::RecordingSink;
pub use querier::SipDeviceInfoQuerier;
