//! Filtering and summary statistics over reconciled trades.

use super::MatchedTrade;
use crate::domain::{Decimal, TimeMs};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Optional predicates applied before summing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeFilter {
    /// Keep trades with `net_profit >= min_profit`.
    #[serde(default)]
    pub min_profit: Option<Decimal>,
    /// Case-insensitive substring of the item name or id.
    #[serde(default, alias = "item")]
    pub item_substring: Option<String>,
    /// Inclusive lower bound on trade date.
    #[serde(default)]
    pub from_ms: Option<TimeMs>,
    /// Inclusive upper bound on trade date.
    #[serde(default)]
    pub to_ms: Option<TimeMs>,
}

impl TradeFilter {
    pub fn matches(&self, trade: &MatchedTrade) -> bool {
        if let Some(min) = self.min_profit {
            if trade.net_profit < min {
                return false;
            }
        }

        if let Some(from) = self.from_ms {
            if trade.date < from {
                return false;
            }
        }
        if let Some(to) = self.to_ms {
            if trade.date > to {
                return false;
            }
        }

        match self
            .item_substring
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                trade.item_id.as_str().to_lowercase().contains(&needle)
                    || trade
                        .item_name
                        .as_deref()
                        .map(|name| name.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            }
        }
    }
}

/// Filtered trades, most recent first, with totals over that set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub trades: Vec<MatchedTrade>,
    pub total_profit: Decimal,
    /// Broker fees on both legs.
    pub total_broker_fees: Decimal,
    pub total_tax: Decimal,
    /// Sum of `total_sell`.
    pub total_volume: Decimal,
    pub trade_count: usize,
    pub unmatched_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("{field} overflowed the decimal range after {trades} trades")]
    Overflow { field: &'static str, trades: usize },
}

/// Filter `trades` and fold the survivors into a summary.
///
/// Pure: the same input and filter always give the same result.
pub fn aggregate(
    trades: &[MatchedTrade],
    filter: &TradeFilter,
) -> Result<LedgerSummary, AggregateError> {
    let mut kept: Vec<MatchedTrade> = trades
        .iter()
        .filter(|t| filter.matches(t))
        .cloned()
        .collect();

    // Stable: equal dates keep their input order.
    kept.sort_by(|a, b| b.date.cmp(&a.date));

    let mut total_profit = Decimal::zero();
    let mut total_broker_fees = Decimal::zero();
    let mut total_tax = Decimal::zero();
    let mut total_volume = Decimal::zero();
    let mut unmatched_count = 0;

    for (index, trade) in kept.iter().enumerate() {
        let add = |field: &'static str, total: Decimal, value: Decimal| {
            total.checked_add(value).ok_or(AggregateError::Overflow {
                field,
                trades: index + 1,
            })
        };
        total_profit = add("totalProfit", total_profit, trade.net_profit)?;
        total_broker_fees = add("totalBrokerFees", total_broker_fees, trade.broker_fee_buy)?;
        total_broker_fees = add("totalBrokerFees", total_broker_fees, trade.broker_fee_sell)?;
        total_tax = add("totalTax", total_tax, trade.sales_tax)?;
        total_volume = add("totalVolume", total_volume, trade.total_sell)?;
        if !trade.has_match {
            unmatched_count += 1;
        }
    }

    Ok(LedgerSummary {
        trade_count: kept.len(),
        trades: kept,
        total_profit,
        total_broker_fees,
        total_tax,
        total_volume,
        unmatched_count,
    })
}
