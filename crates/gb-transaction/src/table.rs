//! The transaction table (spec §4.4, component C4): insert-if-absent by
//! key, lookup, and removal on terminal state or Timer D expiry. A
//! concurrent map stands in for the reader-writer-locked map the spec
//! allows, since `dashmap` shards its own locking per-bucket.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use gb_sip_core::Response;
use gb_sip_transport::Transport;
use tracing::info;

use crate::key::TransactionKey;
use crate::transaction::Transaction;

#[derive(Default)]
pub struct TransactionTable {
    transactions: DashMap<TransactionKey, Arc<Transaction>>,
}

impl TransactionTable {
    pub fn new() -> Arc<Self> {
        Arc::new(TransactionTable {
            transactions: DashMap::new(),
        })
    }

    /// Looks up a live transaction by key.
    pub fn get(&self, key: &TransactionKey) -> Option<Arc<Transaction>> {
        self.transactions.get(key).map(|entry| entry.clone())
    }

    /// Returns the transaction for `key`, creating and binding a new one to
    /// `transport`/`destination` if none exists yet — the "mustTX" pattern
    /// used for both outbound UDP requests and first-touch TCP requests.
    pub fn get_or_create(
        self: &Arc<Self>,
        key: TransactionKey,
        transport: Arc<dyn Transport>,
        destination: SocketAddr,
        reliable: bool,
    ) -> Arc<Transaction> {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        let tx = Transaction::new(key.clone(), transport, destination, reliable);
        self.transactions.insert(key, tx.clone());
        tx
    }

    /// Routes an inbound response to its matching transaction, per spec
    /// §4.5: unmatched responses are logged at info and dropped, never
    /// treated as an error.
    pub async fn route_response(self: &Arc<Self>, resp: Response) {
        let Some(key) = TransactionKey::for_response(&resp) else {
            info!("response missing Via/CSeq, dropping: {} {}", resp.status, resp.reason);
            return;
        };
        match self.get(&key) {
            Some(tx) => {
                let is_final = resp.is_final();
                let timer_d = tx.timer_d();
                tx.receive_response(resp).await;
                if is_final {
                    self.schedule_removal(key, timer_d);
                }
            }
            None => {
                info!(branch = key.branch(), status = resp.status, "no matching transaction, dropping response");
            }
        }
    }

    /// Removes a transaction immediately (non-INVITE final, or a BYE/ACK
    /// that never expects a response).
    pub fn remove(&self, key: &TransactionKey) {
        self.transactions.remove(key);
    }

    fn schedule_removal(self: &Arc<Self>, key: TransactionKey, after: std::time::Duration) {
        if after.is_zero() {
            self.remove(&key);
            return;
        }
        let table = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            table.remove(&key);
        });
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gb_sip_core::{Header, Method, Request, Response, Uri, Via};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        local: SocketAddr,
        sends: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        fn local_addr(&self) -> SocketAddr {
            self.local
        }

        async fn send_message(&self, _message: &gb_sip_core::Message, _destination: SocketAddr) -> gb_infra::Result<()> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn register_request(branch: &str) -> Request {
        let mut req = Request::new(Method::Register, Uri::new("34020000001320000001", "192.0.2.10"));
        req.append_header(Header::Via(Via::new("UDP", "192.0.2.1", branch.to_string())));
        req.append_header(Header::CSeq(gb_sip_core::CSeq { seq: 1, method: Method::Register }));
        req
    }

    #[tokio::test]
    async fn get_or_create_is_idempotent_per_key() {
        let table = TransactionTable::new();
        let transport: Arc<dyn Transport> = Arc::new(CountingTransport {
            local: "127.0.0.1:5060".parse().unwrap(),
            sends: AtomicUsize::new(0),
        });
        let dest: SocketAddr = "192.0.2.1:5060".parse().unwrap();
        let key = TransactionKey::for_request(&register_request("z9hG4bK-1")).unwrap();

        let a = table.get_or_create(key.clone(), transport.clone(), dest, false);
        let b = table.get_or_create(key, transport, dest, false);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn route_response_delivers_to_matching_transaction() {
        let table = TransactionTable::new();
        let transport: Arc<dyn Transport> = Arc::new(CountingTransport {
            local: "127.0.0.1:5060".parse().unwrap(),
            sends: AtomicUsize::new(0),
        });
        let dest: SocketAddr = "192.0.2.1:5060".parse().unwrap();
        let req = register_request("z9hG4bK-2");
        let key = TransactionKey::for_request(&req).unwrap();
        let tx = table.get_or_create(key, transport, dest, true);

        let mut resp = Response::new(200, "OK");
        resp.append_header(Header::Via(Via::new("UDP", "192.0.2.1", "z9hG4bK-2".to_string())));
        resp.append_header(Header::CSeq(gb_sip_core::CSeq { seq: 1, method: Method::Register }));
        table.route_response(resp).await;

        let delivered = tx.next_response().await.unwrap();
        assert_eq!(delivered.status, 200);
        assert!(tx.is_terminal());
    }

    #[tokio::test]
    async fn route_response_with_no_match_is_dropped_silently() {
        let table = TransactionTable::new();
        let mut resp = Response::new(200, "OK");
        resp.append_header(Header::Via(Via::new("UDP", "192.0.2.1", "z9hG4bK-unknown".to_string())));
        resp.append_header(Header::CSeq(gb_sip_core::CSeq { seq: 1, method: Method::Register }));
        table.route_response(resp).await;
        assert!(table.is_empty());
    }
}
