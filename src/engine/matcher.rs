//! FIFO matching of sales against purchase lots.

use super::lots::LotQueue;
use crate::domain::{Decimal, ItemId, TimeMs, Transaction};
use serde::Serialize;
use thiserror::Error;

/// Cost basis found for one sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// `matched_cost / matched_quantity`, zero when nothing matched.
    pub average_buy_price: Decimal,
    pub matched_quantity: u64,
    /// Sum of `consumed * lot.unit_price` over consumed lots.
    pub matched_cost: Decimal,
}

impl MatchResult {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn has_match(&self) -> bool {
        self.matched_quantity > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("transaction {0} is a buy, only sales can be matched")]
    NotASale(String),
    #[error("sale for item {sale} matched against lots of item {queue}")]
    ItemMismatch { sale: ItemId, queue: ItemId },
    #[error("sale at {sale} is older than the last matched sale at {last}")]
    OutOfOrder { sale: TimeMs, last: TimeMs },
    #[error("transaction {transaction} is not a buy of item {queue}")]
    ForeignLot { transaction: String, queue: ItemId },
    #[error("pricing sale {0} overflowed the decimal range")]
    Overflow(String),
}

/// Consume the oldest available lot quantity for `sale`.
///
/// Lots are drained in `(timestamp, seq)` order. The queue is only mutated
/// on success. Sales for one queue must arrive in non-decreasing timestamp
/// order; an older sale is refused with [`MatchError::OutOfOrder`].
pub fn match_sale(sale: &Transaction, lots: &mut LotQueue) -> Result<MatchResult, MatchError> {
    if !sale.is_sell() {
        return Err(MatchError::NotASale(sale.key.clone()));
    }
    if &sale.item_id != lots.item_id() {
        return Err(MatchError::ItemMismatch {
            sale: sale.item_id.clone(),
            queue: lots.item_id().clone(),
        });
    }
    if let Some(last) = lots.last_sale() {
        if sale.timestamp < last {
            return Err(MatchError::OutOfOrder {
                sale: sale.timestamp,
                last,
            });
        }
    }

    // Price the drain read-only first so an overflow leaves the queue intact.
    let overflow = || MatchError::Overflow(sale.key.clone());
    let mut still_needed = sale.quantity;
    let mut matched_cost = Decimal::zero();
    for lot in lots.open_lots() {
        if still_needed == 0 {
            break;
        }
        let taken = still_needed.min(lot.remaining);
        if taken == 0 {
            continue;
        }
        matched_cost = Decimal::from_units(taken)
            .checked_mul(lot.unit_price)
            .and_then(|cost| matched_cost.checked_add(cost))
            .ok_or_else(overflow)?;
        still_needed -= taken;
    }
    let matched_quantity = sale.quantity - still_needed;

    let average_buy_price = if matched_quantity > 0 {
        matched_cost
            .checked_div(Decimal::from_units(matched_quantity))
            .ok_or_else(overflow)?
    } else {
        Decimal::zero()
    };

    let mut to_consume = matched_quantity;
    for lot in lots.open_lots_mut() {
        if to_consume == 0 {
            break;
        }
        to_consume -= lot.consume(to_consume);
    }
    lots.settle(sale.timestamp);

    if matched_quantity < sale.quantity {
        tracing::debug!(
            item = %sale.item_id,
            sale = %sale.key,
            wanted = sale.quantity,
            matched = matched_quantity,
            "Sale only partially covered by purchase lots"
        );
    }

    Ok(MatchResult {
        average_buy_price,
        matched_quantity,
        matched_cost,
    })
}
