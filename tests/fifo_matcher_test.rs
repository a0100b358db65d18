use trade_ledger::domain::{RawTimestamp, ValidationError};
use trade_ledger::engine::{
    compute_matched_trade, match_sale, LotQueue, MatchError, ReconcileError,
};
use trade_ledger::{
    compute_fee_profile, reconcile, Decimal, FeeInputs, FeeProfile, ItemId, Side, TimeMs,
    Transaction, TransactionRecord,
};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn tx(side: Side, qty: u64, price: &str, time_ms: i64, seq: u64) -> Transaction {
    Transaction::new(
        ItemId::new("34"),
        Some("Tritanium".to_string()),
        TimeMs::new(time_ms),
        side,
        qty,
        d(price),
        Some(seq as i64 + 1),
        seq,
    )
}

fn record(item: &str, is_buy: bool, qty: i64, price: f64, ts: i64) -> TransactionRecord {
    TransactionRecord {
        item_id: item.to_string(),
        item_name: None,
        timestamp: RawTimestamp::Millis(ts),
        is_buy,
        quantity: qty,
        unit_price: price,
        transaction_id: None,
    }
}

fn skilled() -> FeeProfile {
    compute_fee_profile(&FeeInputs::new(5, 5))
}

#[test]
fn test_two_lot_scenario_end_to_end() {
    let records = vec![
        record("34", true, 100, 5.0, 1000),
        record("34", true, 50, 6.0, 2000),
        record("34", false, 120, 7.0, 3000),
    ];

    let run = reconcile(&records, &skilled()).unwrap();
    assert!(run.rejected.is_empty());
    assert_eq!(run.trades.len(), 1);

    let trade = &run.trades[0];
    assert_eq!(trade.matched_quantity, 120);
    assert_eq!(trade.average_buy_price.round_dp(4), d("5.1667"));
    assert_eq!(trade.total_buy, d("620"));
    assert_eq!(trade.total_sell, d("840"));
    assert_eq!(trade.gross_profit, d("220"));
    assert_eq!(trade.broker_fee_buy, d("9.3"));
    assert_eq!(trade.broker_fee_sell, d("12.6"));
    assert_eq!(trade.sales_tax, d("30.24"));
    assert_eq!(trade.net_profit, d("167.86"));
    assert!(trade.has_match);
}

#[test]
fn test_lots_drain_oldest_first_across_sales() {
    let mut lots = LotQueue::from_buys(
        ItemId::new("34"),
        vec![tx(Side::Buy, 10, "4", 1000, 0), tx(Side::Buy, 10, "8", 2000, 1)],
    )
    .unwrap();

    let first = match_sale(&tx(Side::Sell, 5, "10", 3000, 2), &mut lots).unwrap();
    assert_eq!(first.average_buy_price, d("4"));

    let second = match_sale(&tx(Side::Sell, 10, "10", 4000, 3), &mut lots).unwrap();
    assert_eq!(second.matched_quantity, 10);
    assert_eq!(second.average_buy_price, d("6"));

    assert_eq!(lots.total_remaining(), 5);
    assert_eq!(lots.total_bought(), 20);
}

#[test]
fn test_matched_never_exceeds_remaining() {
    let mut lots = LotQueue::from_buys(ItemId::new("34"), vec![tx(Side::Buy, 3, "5", 1000, 0)])
        .unwrap();

    let result = match_sale(&tx(Side::Sell, 8, "6", 2000, 1), &mut lots).unwrap();
    assert_eq!(result.matched_quantity, 3);
    assert_eq!(lots.total_remaining(), 0);

    let trade = compute_matched_trade(&tx(Side::Sell, 8, "6", 2000, 1), &result, &skilled())
        .unwrap();
    assert_eq!(trade.quantity, 8);
    assert_eq!(trade.matched_quantity, 3);
    // Full sale quantity is priced at the matched average.
    assert_eq!(trade.total_buy, d("40"));

    let empty = match_sale(&tx(Side::Sell, 1, "6", 3000, 2), &mut lots).unwrap();
    assert!(!empty.has_match());
}

#[test]
fn test_sale_before_every_buy_still_matches() {
    let records = vec![
        record("34", false, 5, 10.0, 1000),
        record("34", true, 5, 4.0, 2000),
    ];
    let run = reconcile(&records, &FeeProfile::untrained()).unwrap();
    assert_eq!(run.trades[0].matched_quantity, 5);
    assert_eq!(run.trades[0].average_buy_price, d("4"));
}

#[test]
fn test_items_do_not_share_lots() {
    let records = vec![
        record("34", true, 10, 5.0, 1000),
        record("35", false, 10, 9.0, 2000),
    ];
    let run = reconcile(&records, &FeeProfile::untrained()).unwrap();
    assert_eq!(run.trades.len(), 1);
    assert!(!run.trades[0].has_match);
    assert_eq!(run.trades[0].item_id, ItemId::new("35"));
}

#[test]
fn test_rejected_records_never_become_lots() {
    let records = vec![
        record("34", true, 0, 5.0, 1000),
        record("34", true, 10, -1.0, 1000),
        record("34", false, 4, 7.0, 2000),
    ];
    let run = reconcile(&records, &FeeProfile::untrained()).unwrap();
    assert_eq!(run.rejected.len(), 2);
    assert_eq!(run.rejected[0].index, 0);
    assert_eq!(run.rejected[1].index, 1);
    assert!(!run.trades[0].has_match);
}

#[test]
fn test_out_of_order_sale_is_refused() {
    let mut lots = LotQueue::from_buys(ItemId::new("34"), vec![tx(Side::Buy, 10, "5", 1000, 0)])
        .unwrap();
    match_sale(&tx(Side::Sell, 2, "6", 5000, 1), &mut lots).unwrap();

    let err = match_sale(&tx(Side::Sell, 2, "6", 4000, 2), &mut lots).unwrap_err();
    assert!(matches!(err, MatchError::OutOfOrder { .. }));
    assert_eq!(lots.total_remaining(), 8);
}

#[test]
fn test_batch_order_does_not_matter() {
    let mut records = vec![
        record("34", false, 120, 7.0, 3000),
        record("34", true, 50, 6.0, 2000),
        record("34", true, 100, 5.0, 1000),
    ];
    let shuffled = reconcile(&records, &skilled()).unwrap();
    records.reverse();
    let ordered = reconcile(&records, &skilled()).unwrap();

    assert_eq!(shuffled.trades[0].net_profit, ordered.trades[0].net_profit);
    assert_eq!(shuffled.trades[0].total_buy, d("620"));
}

#[test]
fn test_reconcile_error_wraps_match_error() {
    let err: ReconcileError = MatchError::NotASale("k".to_string()).into();
    assert!(err.to_string().contains("k"));
}

#[test]
fn test_out_of_range_record_is_rejected_not_fatal() {
    let records = vec![
        record("34", true, 10, 5.0, 500),
        record("34", false, 9_000_000_000_000_000_000, 1.0e10, 1000),
        record("34", false, 4, 7.0, 2000),
    ];
    let run = reconcile(&records, &FeeProfile::untrained()).unwrap();

    assert_eq!(run.rejected.len(), 1);
    assert_eq!(run.rejected[0].index, 1);
    assert!(matches!(
        run.rejected[0].reason,
        ValidationError::NotionalOverflow { .. }
    ));
    assert_eq!(run.trades.len(), 1);
    assert_eq!(run.trades[0].matched_quantity, 4);
}
