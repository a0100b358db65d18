use super::fees::FeeProfile;
use super::matcher::{MatchError, MatchResult};
use super::MatchedTrade;
use crate::domain::{Decimal, Transaction};

/// Turn a matched sale into a profit-annotated trade record.
///
/// `total_buy` prices the full sale quantity at the matched average, so an
/// unmatched remainder carries the same average rather than zero cost.
/// Losses are reported as negative `net_profit`. Any product or difference
/// leaving the decimal range is refused with [`MatchError::Overflow`].
pub fn compute_matched_trade(
    sale: &Transaction,
    matched: &MatchResult,
    fees: &FeeProfile,
) -> Result<MatchedTrade, MatchError> {
    let quantity = Decimal::from_units(sale.quantity);
    let total_sell = in_range(quantity.checked_mul(sale.unit_price), sale)?;

    // Matched cost plus the remainder at the average; exact on a full match.
    let total_buy = if matched.has_match() {
        let remainder =
            Decimal::from_units(sale.quantity.saturating_sub(matched.matched_quantity));
        let remainder_cost = in_range(remainder.checked_mul(matched.average_buy_price), sale)?;
        in_range(matched.matched_cost.checked_add(remainder_cost), sale)?
    } else {
        Decimal::zero()
    };

    let broker_fee_buy = in_range(total_buy.checked_mul(fees.broker_fee_rate), sale)?;
    let broker_fee_sell = in_range(total_sell.checked_mul(fees.broker_fee_rate), sale)?;
    let sales_tax = in_range(total_sell.checked_mul(fees.sales_tax_rate), sale)?;

    let gross_profit = in_range(total_sell.checked_sub(total_buy), sale)?;
    let net_profit = in_range(
        gross_profit
            .checked_sub(broker_fee_buy)
            .and_then(|v| v.checked_sub(broker_fee_sell))
            .and_then(|v| v.checked_sub(sales_tax)),
        sale,
    )?;

    let margin_pct = if total_buy.is_positive() {
        let ratio = net_profit
            .checked_div(total_buy)
            .and_then(|r| r.checked_mul(Decimal::hundred()));
        Some(in_range(ratio, sale)?.round_dp(2))
    } else {
        None
    };

    Ok(MatchedTrade {
        transaction_key: sale.key.clone(),
        date: sale.timestamp,
        seq: sale.seq,
        item_id: sale.item_id.clone(),
        item_name: sale.item_name.clone(),
        average_buy_price: matched.average_buy_price,
        sell_price: sale.unit_price,
        quantity: sale.quantity,
        matched_quantity: matched.matched_quantity,
        total_buy,
        total_sell,
        gross_profit,
        net_profit,
        broker_fee_buy,
        broker_fee_sell,
        sales_tax,
        margin_pct,
        has_match: matched.has_match(),
    })
}

fn in_range(value: Option<Decimal>, sale: &Transaction) -> Result<Decimal, MatchError> {
    value.ok_or_else(|| MatchError::Overflow(sale.key.clone()))
}
