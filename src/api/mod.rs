pub mod fees;
pub mod health;
pub mod ledger;
pub mod reconcile;

use crate::config::Config;
use crate::engine::compute_fee_profile;
use crate::error::AppError;
use crate::ledger::Ledger;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub ledger: Arc<RwLock<Ledger>>,
}

impl AppState {
    /// State with an empty ledger priced at the configured default skills.
    pub fn new(config: Config) -> Self {
        let ledger = Ledger::new(compute_fee_profile(&config.default_fees));
        Self {
            config,
            ledger: Arc::new(RwLock::new(ledger)),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/fee-profile", get(fees::get_fee_profile))
        .route("/v1/reconcile", post(reconcile::post_reconcile))
        .route("/v1/ledger/transactions", post(ledger::post_transactions))
        .route("/v1/ledger/trades", get(ledger::get_trades))
        .route("/v1/ledger/fee-profile", put(ledger::put_fee_profile))
        .layer(cors)
        .with_state(state)
}

/// Reject an inverted time window.
pub(crate) fn check_window(from_ms: Option<i64>, to_ms: Option<i64>) -> Result<(), AppError> {
    if let (Some(from), Some(to)) = (from_ms, to_ms) {
        if from > to {
            return Err(AppError::BadRequest("fromMs must be <= toMs".to_string()));
        }
    }
    Ok(())
}
