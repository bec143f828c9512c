//! Webhook dispatch: a method-to-URL map and a POST-then-check-body
//! delivery rule, matching the original's `notify()` (spec §4.9): success
//! is the response body reading exactly `"OK"` (case-insensitive), not the
//! HTTP status — failures are logged at warning and never propagate to the
//! caller.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{trace, warn};

use crate::event::NotifyEvent;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Notifier {
    http: reqwest::Client,
    routes: HashMap<String, String>,
}

impl Notifier {
    pub fn new(routes: HashMap<String, String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Notifier { http, routes }
    }

    /// Fires and forgets; the caller never awaits a meaningful error here,
    /// so this never needs to return a `Result` the caller would ignore.
    pub async fn notify(&self, event: NotifyEvent) {
        let Some(url) = self.routes.get(event.method) else {
            trace!(method = event.method, "notify config not found");
            return;
        };

        match self.http.post(url).json(&event).send().await {
            Ok(resp) => match resp.text().await {
                Ok(body) if body.trim().eq_ignore_ascii_case("ok") => {
                    trace!(method = event.method, "notify send succeeded");
                }
                Ok(body) => {
                    warn!(method = event.method, body, "notify response was not OK");
                }
                Err(e) => {
                    warn!(method = event.method, error = %e, "failed to read notify response body");
                }
            },
            Err(e) => {
                warn!(method = event.method, error = %e, "notify send failed");
            }
        }
    }

    /// Spawns [`Notifier::notify`] on its own task, mirroring the `go
    /// notify(...)` fire-and-forget call sites in the original handlers.
    pub fn spawn_notify(&self, event: NotifyEvent) {
        let notifier = self.clone();
        tokio::spawn(async move {
            notifier.notify(event).await;
        });
    }
}
