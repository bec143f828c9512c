//! Outbound webhook notifier: event constructors plus the method-to-URL
//! dispatch table (spec §4.9, component C11).

pub mod client;
pub mod event;

pub use client::Notifier;
pub use event::{
    channels_active, devices_active, devices_register, devices_unknown, records_stop, NotifyEvent,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn notify_without_a_configured_route_is_a_silent_noop() {
        let notifier = Notifier::new(HashMap::new());
        notifier.notify(devices_unknown("34020000001110000001", "192.0.2.5:5060")).await;
    }
}
