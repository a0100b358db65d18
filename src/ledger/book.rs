//! Per-item reconciliation state kept between appends.

use crate::domain::{sort_chronological, ItemId, TimeMs, Transaction};
use crate::engine::matcher::{match_sale, MatchError};
use crate::engine::profit::compute_matched_trade;
use crate::engine::reconcile::reconcile_item_with_lots;
use crate::engine::{FeeProfile, LotQueue, MatchedTrade};

/// How an append was applied to an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookUpdate {
    /// New sales matched against the carried lot queue.
    Extended,
    /// The item was reconciled again from all of its transactions.
    Recomputed,
}

/// Transactions, lot state and trades for one item.
///
/// `watermark` is the ordering key of the last sale matched. `shortfall`
/// records whether any sale so far ran out of lots; a new buy could then
/// change an older trade, so the fast path is off.
#[derive(Debug, Clone)]
pub struct ItemBook {
    transactions: Vec<Transaction>,
    lots: LotQueue,
    trades: Vec<MatchedTrade>,
    watermark: Option<(TimeMs, u64)>,
    shortfall: bool,
}

impl ItemBook {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            transactions: Vec::new(),
            lots: LotQueue::empty(item_id),
            trades: Vec::new(),
            watermark: None,
            shortfall: false,
        }
    }

    pub fn item_id(&self) -> &ItemId {
        self.lots.item_id()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn lots(&self) -> &LotQueue {
        &self.lots
    }

    pub fn trades(&self) -> &[MatchedTrade] {
        &self.trades
    }

    /// Fold new transactions for this item into the book.
    ///
    /// Matches incrementally when every new buy is newer than the queued
    /// lots, every new sale is newer than the watermark and no earlier sale
    /// ran short. Otherwise the item is recomputed from scratch. Both paths
    /// give the same trades a one-shot run over all transactions would.
    pub fn apply(
        &mut self,
        mut incoming: Vec<Transaction>,
        fees: &FeeProfile,
    ) -> Result<BookUpdate, MatchError> {
        sort_chronological(&mut incoming);

        if self.can_extend(&incoming) {
            self.extend(incoming, fees)?;
            return Ok(BookUpdate::Extended);
        }

        self.transactions.extend(incoming);
        self.recompute(fees)?;
        Ok(BookUpdate::Recomputed)
    }

    /// Rebuild lots and trades from every stored transaction.
    pub fn recompute(&mut self, fees: &FeeProfile) -> Result<(), MatchError> {
        let (trades, lots) =
            reconcile_item_with_lots(self.item_id().clone(), self.transactions.clone(), fees)?;
        self.watermark = self
            .transactions
            .iter()
            .filter(|tx| tx.is_sell())
            .map(Transaction::chrono_key)
            .max();
        self.shortfall = trades.iter().any(|t| t.matched_quantity < t.quantity);
        self.trades = trades;
        self.lots = lots;
        Ok(())
    }

    fn can_extend(&self, incoming: &[Transaction]) -> bool {
        if self.shortfall {
            return false;
        }
        let last_lot = self.lots.last_lot_key();
        incoming.iter().all(|tx| {
            let floor = if tx.is_buy() { last_lot } else { self.watermark };
            floor.map_or(true, |key| tx.chrono_key() > key)
        })
    }

    fn extend(&mut self, incoming: Vec<Transaction>, fees: &FeeProfile) -> Result<(), MatchError> {
        let (buys, sales): (Vec<Transaction>, Vec<Transaction>) =
            incoming.into_iter().partition(Transaction::is_buy);

        for buy in &buys {
            // can_extend checked ordering, so this always queues.
            let queued = self.lots.push_buy(buy);
            debug_assert!(queued);
        }

        for sale in &sales {
            let matched = match_sale(sale, &mut self.lots)?;
            let trade = compute_matched_trade(sale, &matched, fees)?;
            self.shortfall |= trade.matched_quantity < trade.quantity;
            self.watermark = Some(sale.chrono_key());
            self.trades.push(trade);
        }

        self.transactions.extend(buys);
        self.transactions.extend(sales);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, Side};

    fn tx(side: Side, qty: u64, price: &str, ts: i64, seq: u64) -> Transaction {
        Transaction::new(
            ItemId::new("34"),
            None,
            TimeMs::new(ts),
            side,
            qty,
            Decimal::from_str_canonical(price).unwrap(),
            None,
            seq,
        )
    }

    #[test]
    fn test_later_transactions_extend() {
        let fees = FeeProfile::untrained();
        let mut book = ItemBook::new(ItemId::new("34"));

        let first = vec![tx(Side::Buy, 10, "5", 1000, 0), tx(Side::Sell, 4, "7", 2000, 1)];
        assert_eq!(book.apply(first, &fees).unwrap(), BookUpdate::Extended);

        let second = vec![tx(Side::Buy, 10, "6", 3000, 2), tx(Side::Sell, 10, "8", 4000, 3)];
        assert_eq!(book.apply(second, &fees).unwrap(), BookUpdate::Extended);

        assert_eq!(book.trades().len(), 2);
        // 6 @ 5 + 4 @ 6
        assert_eq!(book.trades()[1].total_buy, Decimal::from_str_canonical("54").unwrap());
        assert_eq!(book.lots().total_remaining(), 6);
    }

    #[test]
    fn test_backdated_buy_forces_recompute() {
        let fees = FeeProfile::untrained();
        let mut book = ItemBook::new(ItemId::new("34"));
        book.apply(vec![tx(Side::Buy, 10, "5", 2000, 0), tx(Side::Sell, 5, "7", 3000, 1)], &fees)
            .unwrap();

        let update = book.apply(vec![tx(Side::Buy, 5, "1", 1000, 2)], &fees).unwrap();
        assert_eq!(update, BookUpdate::Recomputed);
        assert_eq!(book.trades()[0].average_buy_price, Decimal::one());
    }

    #[test]
    fn test_shortfall_forces_recompute_on_new_buy() {
        let fees = FeeProfile::untrained();
        let mut book = ItemBook::new(ItemId::new("34"));
        book.apply(vec![tx(Side::Sell, 5, "7", 1000, 0)], &fees).unwrap();
        assert!(!book.trades()[0].has_match);

        let update = book.apply(vec![tx(Side::Buy, 5, "2", 2000, 1)], &fees).unwrap();
        assert_eq!(update, BookUpdate::Recomputed);
        assert!(book.trades()[0].has_match);
        assert_eq!(book.lots().total_remaining(), 0);
    }

    #[test]
    fn test_backdated_sale_forces_recompute() {
        let fees = FeeProfile::untrained();
        let mut book = ItemBook::new(ItemId::new("34"));
        book.apply(
            vec![
                tx(Side::Buy, 5, "1", 1000, 0),
                tx(Side::Buy, 5, "2", 1100, 1),
                tx(Side::Sell, 5, "7", 3000, 2),
            ],
            &fees,
        )
        .unwrap();

        let update = book.apply(vec![tx(Side::Sell, 5, "7", 2000, 3)], &fees).unwrap();
        assert_eq!(update, BookUpdate::Recomputed);
        let prices: Vec<Decimal> = book.trades().iter().map(|t| t.average_buy_price).collect();
        assert_eq!(prices, vec![Decimal::one(), Decimal::from_units(2)]);
    }
}
