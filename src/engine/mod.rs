//! Pure computation engine for ledger reconciliation.
//!
//! Leaf-first: fee rates, lot queues, FIFO matching, profit, aggregation,
//! and the run driver tying them together.

use crate::domain::{Decimal, ItemId, TimeMs};
use serde::Serialize;

pub mod aggregate;
pub mod fees;
pub mod lots;
pub mod matcher;
pub mod profit;
pub mod reconcile;

pub use aggregate::{aggregate, AggregateError, LedgerSummary, TradeFilter};
pub use fees::{compute_fee_profile, FeeInputs, FeeProfile};
pub use lots::{ingest_buys, Lot, LotQueue};
pub use matcher::{match_sale, MatchError, MatchResult};
pub use profit::compute_matched_trade;
pub use reconcile::{
    reconcile, reconcile_parallel, reconcile_transactions, ReconcileError, Reconciliation,
    RejectedTransaction,
};

/// One reconciled sale.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedTrade {
    /// Key of the sale transaction.
    pub transaction_key: String,
    pub date: TimeMs,
    #[serde(skip)]
    pub seq: u64,
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    /// Weighted over matched lots; zero if unmatched.
    pub average_buy_price: Decimal,
    pub sell_price: Decimal,
    pub quantity: u64,
    pub matched_quantity: u64,
    pub total_buy: Decimal,
    pub total_sell: Decimal,
    pub gross_profit: Decimal,
    pub net_profit: Decimal,
    pub broker_fee_buy: Decimal,
    pub broker_fee_sell: Decimal,
    pub sales_tax: Decimal,
    /// `net_profit / total_buy` in percent, two places.
    pub margin_pct: Option<Decimal>,
    /// False when no lot quantity was available.
    pub has_match: bool,
}
