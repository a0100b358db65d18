//! Stable transaction ordering for deterministic processing.

use crate::domain::{TimeMs, Transaction};

/// Ordering key for transactions: `timestamp -> seq`.
///
/// `seq` is the ingestion order, so simultaneous trades keep the order in
/// which they were submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TransactionOrderingKey {
    pub timestamp: TimeMs,
    pub seq: u64,
}

impl TransactionOrderingKey {
    pub fn from_transaction(tx: &Transaction) -> Self {
        TransactionOrderingKey {
            timestamp: tx.timestamp,
            seq: tx.seq,
        }
    }
}

/// Sort transactions oldest first. The sort is stable.
pub fn sort_chronological(txs: &mut [Transaction]) {
    txs.sort_by_key(TransactionOrderingKey::from_transaction);
}
