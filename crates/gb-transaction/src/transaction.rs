//! One side of a SIP request/response exchange (spec §4.4, component C5):
//! send, UDP retransmission, a response inbox, and the timers that bound
//! both.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use gb_infra::{Error, Result};
use gb_sip_core::{Message, Request, Response};
use gb_sip_transport::Transport;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::key::TransactionKey;
use crate::timer;

const INBOX_CAPACITY: usize = 16;

/// A transaction's single live state transition: requests arrive, get a
/// matching response (or time out), and that's the whole lifecycle — there
/// is no reuse.
pub struct Transaction {
    key: TransactionKey,
    transport: Arc<dyn Transport>,
    destination: SocketAddr,
    reliable: bool,
    created_at: Instant,
    last_request: Mutex<Option<Request>>,
    inbox_tx: mpsc::Sender<Response>,
    inbox_rx: Mutex<mpsc::Receiver<Response>>,
    terminal: AtomicBool,
    cancel_retransmit: Notify,
}

impl Transaction {
    pub(crate) fn new(
        key: TransactionKey,
        transport: Arc<dyn Transport>,
        destination: SocketAddr,
        reliable: bool,
    ) -> Arc<Self> {
        let (inbox_tx, inbox_rx) = mpsc::channel(INBOX_CAPACITY);
        Arc::new(Transaction {
            key,
            transport,
            destination,
            reliable,
            created_at: Instant::now(),
            last_request: Mutex::new(None),
            inbox_tx,
            inbox_rx: Mutex::new(inbox_rx),
            terminal: AtomicBool::new(false),
            cancel_retransmit: Notify::new(),
        })
    }

    pub fn key(&self) -> &TransactionKey {
        &self.key
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal.load(Ordering::Acquire)
    }

    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Sends `req`, arming Timer F and, on an unreliable transport, the
    /// T1/T2 retransmission ladder. Retransmission stops as soon as a
    /// response is delivered through [`Transaction::receive_response`].
    pub async fn request(self: &Arc<Self>, req: Request) -> Result<()> {
        self.transport
            .send_message(&Message::Request(req.clone()), self.destination)
            .await?;
        *self.last_request.lock().await = Some(req);

        if !self.reliable {
            let tx = self.clone();
            tokio::spawn(async move {
                tx.retransmit_loop().await;
            });
        }
        Ok(())
    }

    async fn retransmit_loop(self: Arc<Self>) {
        let mut interval = timer::T1;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.cancel_retransmit.notified() => return,
            }

            if self.is_terminal() || self.age() >= timer::TIMER_F {
                return;
            }

            let request = self.last_request.lock().await.clone();
            if let Some(request) = request {
                trace!(branch = self.key.branch(), ?interval, "retransmitting SIP request");
                if let Err(e) = self
                    .transport
                    .send_message(&Message::Request(request), self.destination)
                    .await
                {
                    warn!(error = %e, "retransmission send failed");
                }
            }
            interval = timer::next_retransmit_interval(interval);
        }
    }

    /// Sends a response on the server side of this transaction.
    pub async fn respond(&self, resp: Response) -> Result<()> {
        self.transport
            .send_message(&Message::Response(resp), self.destination)
            .await
    }

    /// Delivers an inbound response to this transaction's inbox. Marks the
    /// transaction terminal on any final (>=200) status for a non-INVITE
    /// method; an INVITE final response completes the client-side wait but
    /// the transaction itself lingers for Timer D so the table can absorb
    /// retransmitted finals before removing it.
    pub async fn receive_response(&self, resp: Response) {
        self.cancel_retransmit.notify_waiters();
        if resp.is_final() {
            self.terminal.store(true, Ordering::Release);
        }
        if self.inbox_tx.send(resp).await.is_err() {
            debug!(branch = self.key.branch(), "response dropped, inbox closed");
        }
    }

    /// Blocks for the next response, bounded by Timer F.
    pub async fn next_response(&self) -> Result<Response> {
        let mut rx = self.inbox_rx.lock().await;
        match timeout(timer::TIMER_F, rx.recv()).await {
            Ok(Some(resp)) => Ok(resp),
            Ok(None) => Err(Error::Internal("transaction inbox closed".into())),
            Err(_) => Err(Error::TransactionTimeout),
        }
    }

    /// Timer D: how long a terminated INVITE transaction should linger.
    pub fn timer_d(&self) -> std::time::Duration {
        if self.reliable {
            timer::TIMER_D_TCP
        } else {
            timer::TIMER_D_UDP
        }
    }
}
