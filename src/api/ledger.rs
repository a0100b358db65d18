use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::{check_window, AppState};
use crate::domain::{Decimal, TimeMs, TransactionRecord};
use crate::engine::{compute_fee_profile, FeeInputs, FeeProfile, LedgerSummary, TradeFilter};
use crate::error::AppError;
use crate::ledger::AppendOutcome;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTradesQuery {
    pub min_profit: Option<String>,
    pub item: Option<String>,
    pub from_ms: Option<i64>,
    pub to_ms: Option<i64>,
}

impl LedgerTradesQuery {
    pub fn to_filter(&self) -> Result<TradeFilter, AppError> {
        check_window(self.from_ms, self.to_ms)?;

        let min_profit = self
            .min_profit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Decimal::from_str_canonical)
            .transpose()
            .map_err(|_| AppError::BadRequest("Invalid minProfit".to_string()))?;

        Ok(TradeFilter {
            min_profit,
            item_substring: self.item.clone(),
            from_ms: self.from_ms.map(TimeMs::new),
            to_ms: self.to_ms.map(TimeMs::new),
        })
    }
}

/// Append records to the shared ledger.
pub async fn post_transactions(
    State(state): State<AppState>,
    Json(body): Json<AppendRequest>,
) -> Result<Json<AppendOutcome>, AppError> {
    let mut ledger = state.ledger.write().await;
    let outcome = ledger.append(&body.transactions)?;
    Ok(Json(outcome))
}

/// Aggregated view of the shared ledger.
pub async fn get_trades(
    Query(params): Query<LedgerTradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<LedgerSummary>, AppError> {
    let filter = params.to_filter()?;
    let ledger = state.ledger.read().await;
    Ok(Json(ledger.summary(&filter)?))
}

/// Reprice the shared ledger under new skills and standings.
pub async fn put_fee_profile(
    State(state): State<AppState>,
    Json(inputs): Json<FeeInputs>,
) -> Result<Json<FeeProfile>, AppError> {
    let profile = compute_fee_profile(&inputs);
    let mut ledger = state.ledger.write().await;
    ledger.set_fee_profile(profile)?;
    Ok(Json(profile))
}
