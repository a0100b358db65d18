//! Per-item purchase lot queues.

use super::matcher::MatchError;
use crate::domain::{sort_chronological, Decimal, ItemId, TimeMs, Transaction};
use serde::Serialize;
use std::collections::BTreeMap;

/// A purchase with its unconsumed quantity.
///
/// Fully consumed lots are kept as tombstones (`remaining == 0`) so the
/// queue still shows every buy that fed a sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub transaction_key: String,
    pub timestamp: TimeMs,
    pub seq: u64,
    pub quantity: u64,
    pub unit_price: Decimal,
    pub remaining: u64,
}

impl Lot {
    pub fn from_buy(tx: &Transaction) -> Self {
        Self {
            transaction_key: tx.key.clone(),
            timestamp: tx.timestamp,
            seq: tx.seq,
            quantity: tx.quantity,
            unit_price: tx.unit_price,
            remaining: tx.quantity,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Take up to `wanted` units. Returns the amount taken.
    pub(crate) fn consume(&mut self, wanted: u64) -> u64 {
        let taken = wanted.min(self.remaining);
        self.remaining -= taken;
        taken
    }
}

/// Chronological queue of lots for one item.
///
/// `head` indexes the oldest lot that may still have quantity; everything
/// before it is exhausted. `last_sale` is the timestamp of the most recent
/// sale matched against this queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotQueue {
    item_id: ItemId,
    lots: Vec<Lot>,
    head: usize,
    last_sale: Option<TimeMs>,
}

impl LotQueue {
    /// An item with no purchases. Every sale against it is unmatched.
    pub fn empty(item_id: ItemId) -> Self {
        Self {
            item_id,
            lots: Vec::new(),
            head: 0,
            last_sale: None,
        }
    }

    /// Build a queue from buys of a single item. Sorts by `(timestamp, seq)`.
    ///
    /// Refuses a sell or a buy of another item with
    /// [`MatchError::ForeignLot`].
    pub fn from_buys(item_id: ItemId, buys: Vec<Transaction>) -> Result<Self, MatchError> {
        if let Some(stray) = buys.iter().find(|tx| !tx.is_buy() || tx.item_id != item_id) {
            return Err(MatchError::ForeignLot {
                transaction: stray.key.clone(),
                queue: item_id,
            });
        }
        Ok(Self::from_item_buys(item_id, buys))
    }

    /// [`LotQueue::from_buys`] for callers that already partitioned by item.
    pub(crate) fn from_item_buys(item_id: ItemId, mut buys: Vec<Transaction>) -> Self {
        debug_assert!(buys.iter().all(|tx| tx.is_buy() && tx.item_id == item_id));
        sort_chronological(&mut buys);
        Self {
            lots: buys.iter().map(Lot::from_buy).collect(),
            item_id,
            head: 0,
            last_sale: None,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    pub fn last_sale(&self) -> Option<TimeMs> {
        self.last_sale
    }

    /// Sum of unconsumed quantity across all lots.
    pub fn total_remaining(&self) -> u64 {
        self.lots[self.head..]
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.remaining))
    }

    /// Sum of purchased quantity across all lots, consumed or not.
    pub fn total_bought(&self) -> u64 {
        self.lots
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.quantity))
    }

    /// Ordering key of the newest lot.
    pub fn last_lot_key(&self) -> Option<(TimeMs, u64)> {
        self.lots.last().map(|l| (l.timestamp, l.seq))
    }

    /// Append a buy that is newer than every lot already queued.
    ///
    /// Returns false, leaving the queue untouched, if `tx` is not a buy of
    /// this item or would break chronological order.
    pub fn push_buy(&mut self, tx: &Transaction) -> bool {
        let in_order = self
            .last_lot_key()
            .map_or(true, |last| tx.chrono_key() > last);
        if !tx.is_buy() || tx.item_id != self.item_id || !in_order {
            return false;
        }
        self.lots.push(Lot::from_buy(tx));
        true
    }

    /// Lots that may still hold quantity, oldest first.
    pub(crate) fn open_lots(&self) -> &[Lot] {
        &self.lots[self.head..]
    }

    pub(crate) fn open_lots_mut(&mut self) -> &mut [Lot] {
        &mut self.lots[self.head..]
    }

    /// Move `head` past exhausted lots and record the matched sale time.
    pub(crate) fn settle(&mut self, sale_time: TimeMs) {
        while self.head < self.lots.len() && self.lots[self.head].is_exhausted() {
            self.head += 1;
        }
        self.last_sale = Some(sale_time);
    }
}

/// Group buys by item into chronological lot queues.
///
/// Sells are ignored. The stable sort keeps input order for buys sharing a
/// timestamp.
pub fn ingest_buys(transactions: &[Transaction]) -> BTreeMap<ItemId, LotQueue> {
    let mut grouped: BTreeMap<ItemId, Vec<Transaction>> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_buy()) {
        grouped.entry(tx.item_id.clone()).or_default().push(tx.clone());
    }

    grouped
        .into_iter()
        .map(|(item_id, buys)| {
            let queue = LotQueue::from_item_buys(item_id.clone(), buys);
            (item_id, queue)
        })
        .collect()
}
