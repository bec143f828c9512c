//! SIP transaction layer: key derivation, the transaction table, and the
//! per-exchange retransmission/timeout state machine (spec §4.4).

pub mod key;
pub mod table;
pub mod timer;
pub mod transaction;

pub use key::TransactionKey;
pub use table::TransactionTable;
pub use transaction::Transaction;
