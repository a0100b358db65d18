use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{check_window, AppState};
use crate::config::ReconcileMode;
use crate::domain::TransactionRecord;
use crate::engine::{
    aggregate, compute_fee_profile, reconcile, reconcile_parallel, FeeInputs, FeeProfile,
    LedgerSummary, RejectedTransaction, TradeFilter,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub transactions: Vec<TransactionRecord>,
    /// Falls back to the configured defaults when absent.
    #[serde(default)]
    pub skills: Option<FeeInputs>,
    #[serde(default)]
    pub filter: Option<TradeFilter>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileResponse {
    #[serde(flatten)]
    pub summary: LedgerSummary,
    pub fee_profile: FeeProfile,
    pub rejected: Vec<RejectedTransaction>,
}

/// One-shot reconciliation of a submitted batch. Nothing is kept.
pub async fn post_reconcile(
    State(state): State<AppState>,
    Json(body): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let filter = body.filter.unwrap_or_default();
    check_window(
        filter.from_ms.map(|t| t.as_ms()),
        filter.to_ms.map(|t| t.as_ms()),
    )?;

    let inputs = body.skills.unwrap_or(state.config.default_fees);
    let fee_profile = compute_fee_profile(&inputs);

    let run = match state.config.reconcile_mode {
        ReconcileMode::Sequential => reconcile(&body.transactions, &fee_profile)?,
        ReconcileMode::Parallel => reconcile_parallel(body.transactions, fee_profile).await?,
    };

    Ok(Json(ReconcileResponse {
        summary: aggregate(&run.trades, &filter)?,
        fee_profile,
        rejected: run.rejected,
    }))
}
