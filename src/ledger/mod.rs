//! Append-only trade ledger with incremental reconciliation.
//!
//! This module provides:
//! - Deduplication of re-submitted transactions by their stable key
//! - Per-item books that extend in place when new data is strictly newer
//! - Full per-item recomputation when late data lands behind the watermark

use crate::domain::{ItemId, TransactionRecord};
use crate::engine::reconcile::{partition_by_item, sort_trades, validate_records};
use crate::engine::{
    aggregate, AggregateError, FeeProfile, LedgerSummary, MatchError, MatchedTrade,
    RejectedTransaction, TradeFilter,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

pub mod book;

pub use book::{BookUpdate, ItemBook};

/// What one append did to the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOutcome {
    pub accepted: usize,
    /// Records whose key was already in the ledger (or earlier in the batch).
    pub duplicates: usize,
    pub rejected: Vec<RejectedTransaction>,
    pub items_extended: usize,
    pub items_recomputed: usize,
}

/// An open ledger that grows by appends.
///
/// After any sequence of appends, [`Ledger::trades`] equals a one-shot
/// reconciliation over every accepted transaction.
#[derive(Debug, Clone)]
pub struct Ledger {
    fees: FeeProfile,
    next_seq: u64,
    keys: HashSet<String>,
    books: BTreeMap<ItemId, ItemBook>,
}

impl Ledger {
    pub fn new(fees: FeeProfile) -> Self {
        Self {
            fees,
            next_seq: 0,
            keys: HashSet::new(),
            books: BTreeMap::new(),
        }
    }

    pub fn fee_profile(&self) -> &FeeProfile {
        &self.fees
    }

    /// Number of distinct accepted transactions.
    pub fn transaction_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of items with at least one accepted transaction.
    pub fn item_count(&self) -> usize {
        self.books.len()
    }

    pub fn book(&self, item_id: &ItemId) -> Option<&ItemBook> {
        self.books.get(item_id)
    }

    /// Validate, deduplicate and reconcile a batch of records.
    ///
    /// All or nothing: if any item fails to reconcile the ledger is left
    /// exactly as it was.
    pub fn append(&mut self, records: &[TransactionRecord]) -> Result<AppendOutcome, MatchError> {
        let (validated, rejected) = validate_records(records, self.next_seq);

        let mut outcome = AppendOutcome {
            rejected,
            ..AppendOutcome::default()
        };

        let mut batch_keys = HashSet::new();
        let mut fresh = Vec::with_capacity(validated.len());
        for tx in validated {
            if self.keys.contains(&tx.key) || !batch_keys.insert(tx.key.clone()) {
                if tx.transaction_id.is_none() {
                    tracing::debug!(
                        key = %tx.key,
                        item = %tx.item_id,
                        seq = tx.seq,
                        "Dropped record without transaction id matching an earlier one"
                    );
                }
                outcome.duplicates += 1;
            } else {
                fresh.push(tx);
            }
        }
        outcome.accepted = fresh.len();

        let mut staged = Vec::new();
        for (item_id, incoming) in partition_by_item(&fresh) {
            let mut book = self
                .books
                .get(&item_id)
                .cloned()
                .unwrap_or_else(|| ItemBook::new(item_id.clone()));
            match book.apply(incoming, &self.fees)? {
                BookUpdate::Extended => outcome.items_extended += 1,
                BookUpdate::Recomputed => outcome.items_recomputed += 1,
            }
            staged.push((item_id, book));
        }

        self.next_seq += records.len() as u64;
        self.keys.extend(batch_keys);
        self.books.extend(staged);

        tracing::info!(
            accepted = outcome.accepted,
            duplicates = outcome.duplicates,
            rejected = outcome.rejected.len(),
            extended = outcome.items_extended,
            recomputed = outcome.items_recomputed,
            "Ledger append"
        );

        Ok(outcome)
    }

    /// Swap the fee profile and recompute every item under it.
    ///
    /// On error the previous profile and trades stay in place.
    pub fn set_fee_profile(&mut self, fees: FeeProfile) -> Result<(), MatchError> {
        if fees == self.fees {
            return Ok(());
        }
        let mut repriced = self.books.clone();
        for book in repriced.values_mut() {
            book.recompute(&fees)?;
        }
        self.fees = fees;
        self.books = repriced;
        tracing::info!(items = self.books.len(), "Ledger recomputed for new fee profile");
        Ok(())
    }

    /// All reconciled sales, ordered by `(date, seq)`.
    pub fn trades(&self) -> Vec<MatchedTrade> {
        let mut trades: Vec<MatchedTrade> = self
            .books
            .values()
            .flat_map(|book| book.trades().iter().cloned())
            .collect();
        sort_trades(&mut trades);
        trades
    }

    /// Aggregate the already-reconciled trades. Never re-runs matching.
    pub fn summary(&self, filter: &TradeFilter) -> Result<LedgerSummary, AggregateError> {
        aggregate(&self.trades(), filter)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(FeeProfile::untrained())
    }
}
