//! Run driver: validation, per-item partitioning, FIFO matching and profit.

use super::fees::FeeProfile;
use super::lots::LotQueue;
use super::matcher::{match_sale, MatchError};
use super::profit::compute_matched_trade;
use super::MatchedTrade;
use crate::domain::{sort_chronological, ItemId, Transaction, TransactionRecord, ValidationError};
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// A record refused at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedTransaction {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub item_id: String,
    pub reason: ValidationError,
}

/// Output of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// One record per sale, ordered by `(date, seq)`.
    pub trades: Vec<MatchedTrade>,
    pub rejected: Vec<RejectedTransaction>,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error("reconciliation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Validate every record. Accepted transactions get `seq = first_seq + index`.
///
/// A bad record never stops the batch; it lands in the rejected list.
pub fn validate_records(
    records: &[TransactionRecord],
    first_seq: u64,
) -> (Vec<Transaction>, Vec<RejectedTransaction>) {
    let mut accepted = Vec::with_capacity(records.len());
    let mut rejected = Vec::new();

    for (index, record) in records.iter().enumerate() {
        match record.validate(first_seq + index as u64) {
            Ok(tx) => accepted.push(tx),
            Err(reason) => {
                tracing::warn!(index, item = %record.item_id, error = %reason, "Rejected transaction record");
                rejected.push(RejectedTransaction {
                    index,
                    item_id: record.item_id.clone(),
                    reason,
                });
            }
        }
    }

    (accepted, rejected)
}

/// Split transactions into disjoint per-item partitions.
pub fn partition_by_item(transactions: &[Transaction]) -> BTreeMap<ItemId, Vec<Transaction>> {
    let mut partitions: BTreeMap<ItemId, Vec<Transaction>> = BTreeMap::new();
    for tx in transactions {
        partitions.entry(tx.item_id.clone()).or_default().push(tx.clone());
    }
    partitions
}

/// Reconcile every sale of a single item.
///
/// Buys become the item's lot queue; sales are matched oldest first.
pub fn reconcile_item(
    item_id: ItemId,
    transactions: Vec<Transaction>,
    fees: &FeeProfile,
) -> Result<Vec<MatchedTrade>, MatchError> {
    reconcile_item_with_lots(item_id, transactions, fees).map(|(trades, _)| trades)
}

/// [`reconcile_item`], also handing back the final lot queue.
pub(crate) fn reconcile_item_with_lots(
    item_id: ItemId,
    transactions: Vec<Transaction>,
    fees: &FeeProfile,
) -> Result<(Vec<MatchedTrade>, LotQueue), MatchError> {
    let (buys, mut sales): (Vec<Transaction>, Vec<Transaction>) =
        transactions.into_iter().partition(Transaction::is_buy);

    let mut lots = if buys.is_empty() {
        LotQueue::empty(item_id)
    } else {
        LotQueue::from_item_buys(item_id, buys)
    };

    sort_chronological(&mut sales);

    let mut trades = Vec::with_capacity(sales.len());
    for sale in &sales {
        let matched = match_sale(sale, &mut lots)?;
        trades.push(compute_matched_trade(sale, &matched, fees)?);
    }

    tracing::debug!(
        item = %lots.item_id(),
        sales = trades.len(),
        lots = lots.lots().len(),
        remaining = lots.total_remaining(),
        "Reconciled item"
    );

    Ok((trades, lots))
}

/// Reconcile already-validated transactions sequentially.
pub fn reconcile_transactions(
    transactions: &[Transaction],
    fees: &FeeProfile,
) -> Result<Vec<MatchedTrade>, MatchError> {
    let mut trades = Vec::new();
    for (item_id, partition) in partition_by_item(transactions) {
        trades.extend(reconcile_item(item_id, partition, fees)?);
    }
    sort_trades(&mut trades);
    Ok(trades)
}

/// Validate and reconcile a batch of raw records on the calling thread.
pub fn reconcile(
    records: &[TransactionRecord],
    fees: &FeeProfile,
) -> Result<Reconciliation, ReconcileError> {
    let (transactions, rejected) = validate_records(records, 0);
    let trades = reconcile_transactions(&transactions, fees)?;

    log_run(records.len(), &trades, &rejected);
    Ok(Reconciliation { trades, rejected })
}

/// Like [`reconcile`], with one blocking worker per item.
///
/// Item partitions share no state, so the merged output is identical to the
/// sequential run.
pub async fn reconcile_parallel(
    records: Vec<TransactionRecord>,
    fees: FeeProfile,
) -> Result<Reconciliation, ReconcileError> {
    let (transactions, rejected) = validate_records(&records, 0);

    let workers = partition_by_item(&transactions)
        .into_iter()
        .map(|(item_id, partition)| {
            tokio::task::spawn_blocking(move || reconcile_item(item_id, partition, &fees))
        });

    let mut trades = Vec::with_capacity(transactions.len());
    for item_trades in try_join_all(workers).await? {
        trades.extend(item_trades?);
    }
    sort_trades(&mut trades);

    log_run(records.len(), &trades, &rejected);
    Ok(Reconciliation { trades, rejected })
}

/// Chronological output order, input order on ties.
pub(crate) fn sort_trades(trades: &mut [MatchedTrade]) {
    trades.sort_by_key(|t| (t.date, t.seq));
}

fn log_run(records: usize, trades: &[MatchedTrade], rejected: &[RejectedTransaction]) {
    let unmatched = trades.iter().filter(|t| !t.has_match).count();
    tracing::info!(
        records,
        sales = trades.len(),
        unmatched,
        rejected = rejected.len(),
        "Reconciliation complete"
    );
}
